use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Serialize, Serializer};
use serde_json::ser::PrettyFormatter;
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};
use strum::{Display, EnumString};
use tracing::info;

use crate::model::{serialize_logos, ClubLogo, LogoMap};

pub const DEFAULT_OUTPUT: &str = "club_logos.json";

/// Key order of the written JSON object.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumString, Display, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum KeyOrder {
    /// Clubs in the order they were found
    #[default]
    Insertion,
    /// Clubs sorted by name
    Sorted,
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    path: PathBuf,
    order: KeyOrder,
}

struct Ordered<'a>(Vec<&'a ClubLogo>);

impl Serialize for Ordered<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_logos(self.0.iter().copied(), serializer)
    }
}

impl OutputWriter {
    pub fn new(path: impl Into<PathBuf>, order: KeyOrder) -> Self {
        Self {
            path: path.into(),
            order,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn render(&self, logos: &LogoMap) -> Result<String> {
        let ordered = match self.order {
            KeyOrder::Insertion => Ordered(logos.iter().collect()),
            KeyOrder::Sorted => Ordered(logos.sorted()),
        };

        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        ordered.serialize(&mut ser)?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn write(&self, logos: &LogoMap) -> Result<()> {
        let json = self.render(logos)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        info!(path = %self.path.display(), clubs = logos.len(), "saved club logos");
        Ok(())
    }
}

/// Print the keys that gave nothing, one line, the way they were searched.
pub fn report_failed(out: &mut impl Write, failed: &[String]) -> io::Result<()> {
    if failed.is_empty() {
        return Ok(());
    }
    writeln!(out, "Failed to find results for the following keys:")?;
    writeln!(out, "{failed:?}")
}
