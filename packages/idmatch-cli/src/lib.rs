//! Command-line conventions shared by the idmatch binaries.

use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};

/// Package version, git revision, and target triple, e.g. `0.1.0-1a2b3c4-x86_64-unknown-linux-gnu`.
pub const VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"-",
	env!("VERGEN_GIT_SHA"),
	"-",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

pub const ABOUT: &str = "Ranks case records against a face photo and a physical description.";

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.literal(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
}
