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

use std::{
	fmt,
	path::{Path, PathBuf},
	str::FromStr,
};

use anyhow::{Error, anyhow};
use chrono::{Datelike, NaiveDate};
use config::Value;
use indexmap::IndexMap;
use log::warn;

use crate::desktop::DetectedDisplay;

#[derive(Debug, Default, clap::Parser)]
#[command()]
pub struct CommandLineArgs {
	/// Subreddits to search, each name[:sort[:limit[:timeframe]]]
	#[arg(value_name = "SUBREDDIT")]
	pub subreddits: Vec<String>,

	#[arg(short, long = "config", value_names = ["FILE"], default_value = "redditbg")]
	pub config_file: PathBuf,

	/// Only change this display (1-based index)
	#[arg(short, long, value_name = "INDEX")]
	pub display: Option<usize>,

	/// Minimum image resolution, WIDTHxHEIGHT
	#[arg(short = 'r', long = "min-resolution", value_name = "RESOLUTION")]
	pub min_resolution: Option<Resolution>,

	/// Use this image instead of searching subreddits
	#[arg(short, long, value_name = "URL")]
	pub url: Option<String>,

	/// Download an image without changing the background
	#[arg(short = 'n', long)]
	pub download_only: bool,

	/// Directory to download images to
	#[arg(short = 'o', long = "directory", value_name = "DIR")]
	pub download_directory: Option<PathBuf>,

	/// Debug logging
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Resolution {
	pub width: u32,
	pub height: u32,
}

impl Resolution {
	pub fn meets(&self, min: &Resolution) -> bool {
		self.width >= min.width && self.height >= min.height
	}
}

impl FromStr for Resolution {
	type Err = Error;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let (width, height) = value
			.split_once(['x', 'X'])
			.ok_or_else(|| anyhow!("Invalid resolution {value:?}"))?;

		Ok(Self {
			width: width.trim().parse()?,
			height: height.trim().parse()?,
		})
	}
}

impl fmt::Display for Resolution {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

/// Placeholder subreddit that becomes "<season>porn" when parsed
pub const SEASONAL: &str = "seasonal";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selector {
	pub name: String,
	pub sort: String,
	pub limit: u32,
	pub timeframe: String,
}

impl Selector {
	const DEFAULT_SORT: &'static str = "top";
	const DEFAULT_LIMIT: u32 = 25;
	const DEFAULT_TIMEFRAME: &'static str = "week";

	pub fn parse(token: &str, today: NaiveDate) -> Result<Self, Error> {
		let mut fields = token.split(':');
		let name = fields
			.next()
			.filter(|name| !name.is_empty())
			.ok_or_else(|| anyhow!("Missing subreddit name in {token:?}"))?;
		let name = if name == SEASONAL {
			season(today).to_owned() + "porn"
		} else {
			name.to_owned()
		};

		let sort = fields
			.next()
			.filter(|field| !field.is_empty())
			.unwrap_or(Self::DEFAULT_SORT)
			.to_owned();
		let limit = match fields.next().filter(|field| !field.is_empty()) {
			Some(limit) => limit
				.parse()
				.map_err(|err| anyhow!("Invalid limit in {token:?}: {err}"))?,
			None => Self::DEFAULT_LIMIT,
		};
		let timeframe = fields
			.next()
			.filter(|field| !field.is_empty())
			.unwrap_or(Self::DEFAULT_TIMEFRAME)
			.to_owned();

		Ok(Self {
			name,
			sort,
			limit,
			timeframe,
		})
	}
}

/* Day-of-year buckets, Northern hemisphere */
fn season(date: NaiveDate) -> &'static str {
	match date.ordinal() {
		80..172 => "spring",
		172..264 => "summer",
		264..355 => "autumn",
		_ => "winter",
	}
}

#[derive(Clone, Debug)]
pub struct Display {
	pub index: usize,
	pub min_resolution: Resolution,
	pub selectors: Vec<Selector>,
	pub image_url: Option<String>,
}

#[derive(Debug)]
pub struct Config {
	pub download_only: bool,
	pub download_directory: PathBuf,
	pub displays: Vec<Display>,
}

impl Config {
	const FALLBACK_SUBREDDITS: [&'static str; 3] = ["wallpaper", "wallpapers", "EarthPorn"];
	const DOWNLOAD_DIR: &'static str = ".redditbg";

	/// Layered merge: hardware defaults, then the config file, then the
	/// command line, later layers winning field-by-field per display.
	pub fn resolve(
		args: &CommandLineArgs,
		detected: Vec<DetectedDisplay>,
		today: NaiveDate,
	) -> Result<Self, Error> {
		let fallback = Self::FALLBACK_SUBREDDITS
			.iter()
			.map(|name| Selector::parse(name, today))
			.collect::<Result<Vec<_>, _>>()?;

		let mut displays = detected
			.iter()
			.map(|detected| Display {
				index: detected.index,
				min_resolution: detected.resolution,
				selectors: fallback.clone(),
				image_url: None,
			})
			.collect::<Vec<_>>();

		let mut download_only = false;
		let mut download_directory = dirs::home_dir()
			.ok_or_else(|| anyhow!("No home directory"))?
			.join(Self::DOWNLOAD_DIR);

		let file = load_file(&args.config_file);
		let default_section = file.get("default").and_then(section);

		if let Some(table) = &default_section {
			if let Some(value) = table.get("download_only") {
				match value.clone().into_bool() {
					Ok(flag) => download_only = flag,
					Err(err) => warn!("Invalid download_only value: {err}"),
				}
			}

			if let Some(value) = table.get("download_directory") {
				match value.clone().into_string() {
					Ok(dir) => download_directory = PathBuf::from(dir),
					Err(err) => warn!("Invalid download_directory value: {err}"),
				}
			}
		}

		for display in &mut displays {
			let table = file
				.get(&format!("desktop{}", display.index))
				.and_then(section)
				.or_else(|| default_section.clone());

			if let Some(table) = table {
				apply_section(display, &table, today);
			}
		}

		if let Some(index) = args.display {
			displays.retain(|display| display.index == index);

			if displays.is_empty() {
				return Err(anyhow!("No display {index}"));
			}
		}

		if !args.subreddits.is_empty() {
			let selectors = args
				.subreddits
				.iter()
				.map(|token| Selector::parse(token, today))
				.collect::<Result<Vec<_>, _>>()?;

			for display in &mut displays {
				display.selectors = selectors.clone();
			}
		}

		if let Some(min_resolution) = args.min_resolution {
			for display in &mut displays {
				display.min_resolution = min_resolution;
			}
		}

		if let Some(url) = &args.url {
			for display in &mut displays {
				display.image_url = Some(url.clone());
			}
		}

		if args.download_only {
			download_only = true;
		}

		if let Some(dir) = &args.download_directory {
			download_directory = dir.clone();
		}

		Ok(Self {
			download_only,
			download_directory,
			displays,
		})
	}
}

fn load_file(path: &Path) -> IndexMap<String, Value> {
	config::Config::builder()
		.add_source(config::File::from(path).required(false))
		.build()
		.and_then(|config| config.try_deserialize::<IndexMap<String, Value>>())
		.inspect_err(|err| warn!("Config file error: {err}"))
		.unwrap_or_default()
}

fn section(value: &Value) -> Option<config::Map<String, Value>> {
	value
		.clone()
		.into_table()
		.inspect_err(|err| warn!("Invalid config section: {err}"))
		.ok()
}

fn apply_section(display: &mut Display, table: &config::Map<String, Value>, today: NaiveDate) {
	if let Some(value) = table.get("subreddits") {
		match value.clone().into_string() {
			Ok(tokens) => {
				let selectors = parse_selector_list(&tokens, today);

				if selectors.is_empty() {
					warn!("Desktop {}: no usable subreddits in config", display.index);
				} else {
					display.selectors = selectors;
				}
			}
			Err(err) => warn!("Invalid subreddits value: {err}"),
		}
	}

	if let Some(value) = table.get("min_resolution") {
		match value.clone().into_string() {
			Ok(text) => match text.parse() {
				Ok(min_resolution) => display.min_resolution = min_resolution,
				Err(err) => warn!("Invalid min_resolution {text:?}: {err}"),
			},
			Err(err) => warn!("Invalid min_resolution value: {err}"),
		}
	}
}

fn parse_selector_list(tokens: &str, today: NaiveDate) -> Vec<Selector> {
	tokens
		.split(',')
		.map(str::trim)
		.filter(|token| !token.is_empty())
		.filter_map(|token| {
			Selector::parse(token, today)
				.inspect_err(|err| warn!("Skipping subreddit {token:?}: {err}"))
				.ok()
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;

	fn day(ordinal: u32) -> NaiveDate {
		NaiveDate::from_yo_opt(2025, ordinal).unwrap()
	}

	fn detected() -> Vec<DetectedDisplay> {
		vec![
			DetectedDisplay {
				index: 1,
				resolution: Resolution {
					width: 2560,
					height: 1440,
				},
			},
			DetectedDisplay {
				index: 2,
				resolution: Resolution {
					width: 1920,
					height: 1080,
				},
			},
		]
	}

	#[test]
	fn selector_full_token() {
		let selector = Selector::parse("foo:new:10:day", day(1)).unwrap();

		assert_eq!(selector.name, "foo");
		assert_eq!(selector.sort, "new");
		assert_eq!(selector.limit, 10);
		assert_eq!(selector.timeframe, "day");
	}

	#[test]
	fn selector_name_only() {
		let selector = Selector::parse("foo", day(1)).unwrap();

		assert_eq!(selector.name, "foo");
		assert_eq!(selector.sort, "top");
		assert_eq!(selector.limit, 25);
		assert_eq!(selector.timeframe, "week");
	}

	#[test]
	fn selector_partial_token() {
		let selector = Selector::parse("foo:new", day(1)).unwrap();

		assert_eq!(selector.sort, "new");
		assert_eq!(selector.limit, 25);
		assert_eq!(selector.timeframe, "week");
	}

	#[test]
	fn selector_invalid() {
		assert!(Selector::parse("", day(1)).is_err());
		assert!(Selector::parse(":top", day(1)).is_err());
		assert!(Selector::parse("foo:top:many", day(1)).is_err());
	}

	#[test]
	fn selector_seasonal() {
		assert_eq!(
			Selector::parse("seasonal", day(100)).unwrap().name,
			"springporn"
		);
		assert_eq!(
			Selector::parse("seasonal:new", day(200)).unwrap().name,
			"summerporn"
		);
	}

	#[test]
	fn season_boundaries() {
		assert_eq!(season(day(79)), "winter");
		assert_eq!(season(day(80)), "spring");
		assert_eq!(season(day(171)), "spring");
		assert_eq!(season(day(172)), "summer");
		assert_eq!(season(day(263)), "summer");
		assert_eq!(season(day(264)), "autumn");
		assert_eq!(season(day(354)), "autumn");
		assert_eq!(season(day(355)), "winter");
	}

	#[test]
	fn resolution_parsing() {
		let resolution: Resolution = "1920x1080".parse().unwrap();

		assert_eq!(resolution.width, 1920);
		assert_eq!(resolution.height, 1080);
		assert_eq!(resolution.to_string(), "1920x1080");
		assert_eq!("2560 X 1440".parse::<Resolution>().unwrap().width, 2560);
		assert!("1920".parse::<Resolution>().is_err());
		assert!("wide x tall".parse::<Resolution>().is_err());
	}

	#[test]
	fn resolution_meets() {
		let min = Resolution {
			width: 1920,
			height: 1080,
		};

		assert!(min.meets(&min));
		assert!(
			Resolution {
				width: 2560,
				height: 1440
			}
			.meets(&min)
		);
		assert!(
			!Resolution {
				width: 2560,
				height: 1079
			}
			.meets(&min)
		);
	}

	#[test]
	fn hardware_defaults() {
		let config = Config::resolve(&CommandLineArgs::default(), detected(), day(1)).unwrap();

		assert!(!config.download_only);
		assert_eq!(config.displays.len(), 2);
		assert_eq!(config.displays[0].min_resolution.width, 2560);
		assert_eq!(config.displays[1].min_resolution.width, 1920);
		assert_eq!(config.displays[0].selectors.len(), 3);
		assert_eq!(config.displays[0].selectors[0].name, "wallpaper");
	}

	#[test]
	fn file_section_overrides_hardware() {
		let mut display = Display {
			index: 1,
			min_resolution: Resolution {
				width: 2560,
				height: 1440,
			},
			selectors: Vec::new(),
			image_url: None,
		};
		let mut table = config::Map::new();

		table.insert(
			"min_resolution".to_owned(),
			Value::from("800x600".to_owned()),
		);
		table.insert(
			"subreddits".to_owned(),
			Value::from("foo:new, bar".to_owned()),
		);
		apply_section(&mut display, &table, day(1));

		assert_eq!(display.min_resolution.width, 800);
		assert_eq!(display.selectors.len(), 2);
		assert_eq!(display.selectors[0].name, "foo");
		assert_eq!(display.selectors[0].sort, "new");
		assert_eq!(display.selectors[1].name, "bar");
	}

	#[test]
	fn bad_section_values_are_skipped() {
		let mut display = Display {
			index: 1,
			min_resolution: Resolution {
				width: 2560,
				height: 1440,
			},
			selectors: Vec::new(),
			image_url: None,
		};
		let mut table = config::Map::new();

		table.insert("min_resolution".to_owned(), Value::from("huge".to_owned()));
		apply_section(&mut display, &table, day(1));

		assert_eq!(display.min_resolution.width, 2560);
	}

	#[test]
	fn cli_overrides_file_and_hardware() {
		let path = std::env::temp_dir().join(format!("redditbg-{}.ini", uuid::Uuid::new_v4()));

		fs::write(
			&path,
			"[default]\ndownload_only = true\n\n[desktop1]\nmin_resolution = 800x600\n",
		)
		.unwrap();

		let args = CommandLineArgs {
			config_file: path.clone(),
			..Default::default()
		};
		let config = Config::resolve(&args, detected(), day(1)).unwrap();

		assert!(config.download_only);
		assert_eq!(config.displays[0].min_resolution.width, 800);
		/* No desktop2 section and no override in the default section */
		assert_eq!(config.displays[1].min_resolution.width, 1920);

		let args = CommandLineArgs {
			config_file: path.clone(),
			min_resolution: Some(Resolution {
				width: 1024,
				height: 768,
			}),
			..Default::default()
		};
		let config = Config::resolve(&args, detected(), day(1)).unwrap();

		assert_eq!(config.displays[0].min_resolution.width, 1024);
		assert_eq!(config.displays[1].min_resolution.width, 1024);

		fs::remove_file(path).unwrap();
	}

	#[test]
	fn default_section_applies_to_unlisted_displays() {
		let path = std::env::temp_dir().join(format!("redditbg-{}.ini", uuid::Uuid::new_v4()));

		fs::write(
			&path,
			"[default]\nsubreddits = foo\n\n[desktop1]\nsubreddits = bar\n",
		)
		.unwrap();

		let args = CommandLineArgs {
			config_file: path.clone(),
			..Default::default()
		};
		let config = Config::resolve(&args, detected(), day(1)).unwrap();

		assert_eq!(config.displays[0].selectors[0].name, "bar");
		assert_eq!(config.displays[1].selectors[0].name, "foo");

		fs::remove_file(path).unwrap();
	}

	#[test]
	fn cli_subreddits_replace_all_displays() {
		let args = CommandLineArgs {
			subreddits: vec!["foo:new:10:day".to_owned()],
			..Default::default()
		};
		let config = Config::resolve(&args, detected(), day(1)).unwrap();

		for display in &config.displays {
			assert_eq!(display.selectors.len(), 1);
			assert_eq!(display.selectors[0].name, "foo");
		}
	}

	#[test]
	fn restrict_to_one_display() {
		let args = CommandLineArgs {
			display: Some(2),
			..Default::default()
		};
		let config = Config::resolve(&args, detected(), day(1)).unwrap();

		assert_eq!(config.displays.len(), 1);
		assert_eq!(config.displays[0].index, 2);

		let args = CommandLineArgs {
			display: Some(3),
			..Default::default()
		};

		assert!(Config::resolve(&args, detected(), day(1)).is_err());
	}

	#[test]
	fn url_bypasses_search() {
		let args = CommandLineArgs {
			url: Some("https://example.com/a.png".to_owned()),
			..Default::default()
		};
		let config = Config::resolve(&args, detected(), day(1)).unwrap();

		for display in &config.displays {
			assert_eq!(
				display.image_url.as_deref(),
				Some("https://example.com/a.png")
			);
		}
	}
}
