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
mod config;
mod desktop;
mod reddit;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Error;
use clap::Parser;
use config::{CommandLineArgs, Config, Display};
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use reddit::{Client, Post};

fn main() -> Result<ExitCode, Error> {
	let args: CommandLineArgs = CommandLineArgs::parse();

	stderrlog::new()
		.module(module_path!())
		.show_module_names(true)
		.verbosity(usize::from(args.verbose) + 2)
		.init()
		.unwrap();

	let today = chrono::Local::now().date_naive();
	let config = Config::resolve(&args, desktop::detect(), today)?;

	desktop::prepare_download_dir(&config.download_directory)?;

	let client = Client::new()?;

	/* One display failing never stops the others */
	for display in &config.displays {
		if let Err(err) = run_display(&client, &config, display) {
			error!("Desktop {}: {err:#}", display.index);
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn run_display(client: &Client, config: &Config, display: &Display) -> Result<(), Error> {
	let mut candidates = candidates(client, display);

	candidates.shuffle(&mut rand::thread_rng());

	let Some(path) = select_image(&candidates, |url| {
		client.download(url, &config.download_directory)
	}) else {
		info!("Desktop {}: no image found", display.index);
		return Ok(());
	};

	if config.download_only {
		info!("Desktop {}: downloaded {}", display.index, path.display());
	} else {
		desktop::set_background(display.index, &path)?;
		info!(
			"Desktop {}: background set to {}",
			display.index,
			path.display()
		);
	}

	Ok(())
}

/// Image URLs for one display, accumulated across all of its subreddits
fn candidates(client: &Client, display: &Display) -> Vec<String> {
	if let Some(url) = &display.image_url {
		return vec![url.clone()];
	}

	let mut urls = Vec::new();

	for selector in &display.selectors {
		/* A subreddit that fails contributes nothing; the others still run */
		match client.posts(selector) {
			Ok(posts) => {
				debug!("r/{}: {} posts", selector.name, posts.len());

				urls.extend(
					posts
						.iter()
						.filter(|post| reddit::accepts(post, &display.min_resolution))
						.filter_map(Post::image_url),
				);
			}
			Err(err) => {
				warn!("r/{}: {err:#}", selector.name);
			}
		}
	}

	urls
}

/// First candidate that downloads successfully wins; the rest are
/// never attempted
fn select_image<F>(candidates: &[String], mut download: F) -> Option<PathBuf>
where
	F: FnMut(&str) -> Result<PathBuf, Error>,
{
	candidates.iter().find_map(|url| {
		download(url)
			.inspect_err(|err| debug!("Skipping {url}: {err:#}"))
			.ok()
	})
}
