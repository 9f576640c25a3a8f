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
	fs,
	path::{Path, PathBuf},
	sync::LazyLock,
};

use anyhow::Error;
use log::{debug, trace};
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::{Resolution, Selector};

/* Reddit rejects the default library user agent */
const USER_AGENT: &str = concat!("redditbg/", env!("CARGO_PKG_VERSION"));

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

static TITLE_RESOLUTION: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\[\s*(\d+)\s*[xX]\s*(\d+)\s*\]").unwrap());

#[derive(Debug, Deserialize)]
struct Listing {
	data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
	#[serde(default)]
	children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
	data: ChildData,
}

#[derive(Debug, Deserialize)]
struct ChildData {
	title: String,
	url: String,
}

#[derive(Clone, Debug)]
pub struct Post {
	pub subreddit: String,
	pub title: String,
	pub url: String,
}

impl Post {
	/// Bracketed dimensions from the title, e.g. "[1920x1080]"
	pub fn resolution(&self) -> Option<Resolution> {
		let captures = TITLE_RESOLUTION.captures(&self.title)?;

		Some(Resolution {
			width: captures[1].parse().ok()?,
			height: captures[2].parse().ok()?,
		})
	}

	/// The URL to download, if this post links to an image
	pub fn image_url(&self) -> Option<String> {
		match extension(&self.url) {
			Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => Some(self.url.clone()),
			Some(_) => None,
			/* Imgur page links serve the image if an extension is appended */
			None if self.url.contains("imgur.com/") => {
				Some(self.url.trim_end_matches('/').to_owned() + ".jpg")
			}
			None => None,
		}
	}
}

/// Accept a post iff its title declares a resolution meeting the minimum;
/// a post with no parseable resolution is always rejected
pub fn accepts(post: &Post, min: &Resolution) -> bool {
	match post.resolution() {
		Some(resolution) if resolution.meets(min) => true,
		Some(resolution) => {
			trace!(
				"r/{} {:?}: {resolution} below {min}",
				post.subreddit, post.title
			);
			false
		}
		None => {
			trace!("r/{} {:?}: no resolution in title", post.subreddit, post.title);
			false
		}
	}
}

#[derive(Debug)]
pub struct Client {
	http: reqwest::blocking::Client,
}

impl Client {
	pub fn new() -> Result<Self, Error> {
		Ok(Self {
			http: reqwest::blocking::Client::builder()
				.user_agent(USER_AGENT)
				.build()?,
		})
	}

	/// Fetch one subreddit listing, in listing order
	pub fn posts(&self, selector: &Selector) -> Result<Vec<Post>, Error> {
		let url = format!(
			"https://www.reddit.com/r/{}/{}.json?t={}&limit={}",
			selector.name, selector.sort, selector.timeframe, selector.limit
		);

		debug!("Fetch {url}");

		let listing: Listing = self.http.get(&url).send()?.error_for_status()?.json()?;

		Ok(listing
			.data
			.children
			.into_iter()
			.map(|child| Post {
				subreddit: selector.name.clone(),
				title: child.data.title,
				url: child.data.url,
			})
			.collect())
	}

	/// Download one image to a uniquely named file in `dir`
	pub fn download(&self, url: &str, dir: &Path) -> Result<PathBuf, Error> {
		debug!("Download {url}");

		let bytes = self.http.get(url).send()?.error_for_status()?.bytes()?;
		let ext = extension(url).unwrap_or_else(|| "jpg".to_owned());
		let path = dir.join(format!("{}.{ext}", Uuid::new_v4()));

		fs::write(&path, &bytes)?;

		Ok(path)
	}
}

fn extension(url: &str) -> Option<String> {
	let path = url.split(['?', '#']).next().unwrap_or(url);
	let (_, ext) = path.rsplit_once('.')?;

	if ext.is_empty() || ext.contains('/') {
		/* The last dot was in the host name */
		None
	} else {
		Some(ext.to_ascii_lowercase())
	}
}
