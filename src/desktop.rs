/*
 * Copyright 2026  redditbg contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use std::{fs, io, path::Path, process::Command};

use anyhow::{Error, anyhow};
use log::{debug, warn};
use serde::Deserialize;

use crate::config::Resolution;

const FALLBACK_RESOLUTION: Resolution = Resolution {
	width: 1920,
	height: 1080,
};

#[derive(Debug)]
pub struct DetectedDisplay {
	pub index: usize,
	pub resolution: Resolution,
}

#[derive(Debug, Deserialize)]
struct ProfilerReport {
	#[serde(rename = "SPDisplaysDataType", default)]
	cards: Vec<ProfilerCard>,
}

#[derive(Debug, Deserialize)]
struct ProfilerCard {
	#[serde(rename = "spdisplays_ndrvs", default)]
	displays: Vec<ProfilerDisplay>,
}

#[derive(Debug, Deserialize)]
struct ProfilerDisplay {
	#[serde(rename = "_spdisplays_pixels")]
	pixels: Option<String>,
	#[serde(rename = "spdisplays_resolution")]
	resolution: Option<String>,
}

impl ProfilerDisplay {
	fn native_resolution(&self) -> Option<Resolution> {
		let text = self.pixels.as_deref().or(self.resolution.as_deref())?;
		/* The resolution field carries a refresh rate suffix */
		let text = text.split('@').next()?;

		text.trim().parse().ok()
	}
}

/// Connected displays with native resolution, 1-based in AppleScript
/// desktop order
pub fn detect() -> Vec<DetectedDisplay> {
	let displays = query().unwrap_or_else(|err| {
		warn!("Display detection failed: {err:#}");
		Vec::new()
	});

	if displays.is_empty() {
		warn!("No displays detected, assuming one at {FALLBACK_RESOLUTION}");

		vec![DetectedDisplay {
			index: 1,
			resolution: FALLBACK_RESOLUTION,
		}]
	} else {
		displays
	}
}

fn query() -> Result<Vec<DetectedDisplay>, Error> {
	let output = Command::new("system_profiler")
		.arg("SPDisplaysDataType")
		.arg("-json")
		.output()?;

	if !output.status.success() {
		return Err(anyhow!("system_profiler exited with {}", output.status));
	}

	let report: ProfilerReport = serde_json::from_slice(&output.stdout)?;

	Ok(report
		.cards
		.iter()
		.flat_map(|card| &card.displays)
		.enumerate()
		.map(|(i, display)| DetectedDisplay {
			index: i + 1,
			resolution: display.native_resolution().unwrap_or_else(|| {
				warn!(
					"Display {}: unknown resolution, assuming {FALLBACK_RESOLUTION}",
					i + 1
				);
				FALLBACK_RESOLUTION
			}),
		})
		.collect())
}

/// Set one display's background image
pub fn set_background(index: usize, path: &Path) -> Result<(), Error> {
	let script = format!(
		r#"tell application "System Events" to set picture of desktop {index} to "{}""#,
		path.display()
	);

	debug!("osascript: {script}");

	let output = Command::new("osascript").arg("-e").arg(&script).output()?;

	if output.status.success() {
		Ok(())
	} else {
		Err(anyhow!(
			"osascript exited with {}: {}",
			output.status,
			String::from_utf8_lossy(&output.stderr).trim()
		))
	}
}

/// Destroy and recreate the download directory so that files never
/// persist from one run to the next
pub fn prepare_download_dir(dir: &Path) -> Result<(), Error> {
	match fs::remove_dir_all(dir) {
		Ok(()) => {}
		Err(err) if err.kind() == io::ErrorKind::NotFound => {}
		Err(err) => {
			return Err(anyhow!("Unable to remove {}: {err}", dir.display()));
		}
	}

	fs::create_dir_all(dir)?;

	Ok(())
}
