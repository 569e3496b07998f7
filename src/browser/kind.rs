//! Browser kinds and the top level each one shows

use crate::model::DataKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of tree view registered in a viewer
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum BrowserKind {
    /// Projects, datasets and their images
    #[default]
    ContainerExplorer,
    TagExplorer,
    /// Screens and plates
    ScreenExplorer,
    /// Every image regardless of container
    ImageExplorer,
    FileExplorer,
    /// Groups and their experimenters
    AdminExplorer,
}

impl BrowserKind {
    /// All kinds in registry order
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::ContainerExplorer,
            Self::TagExplorer,
            Self::ScreenExplorer,
            Self::ImageExplorer,
            Self::FileExplorer,
            Self::AdminExplorer,
        ]
    }

    /// Object kinds shown at the top level
    #[must_use]
    pub fn root_kinds(self) -> Vec<DataKind> {
        match self {
            Self::ContainerExplorer => vec![DataKind::Project, DataKind::Dataset],
            Self::TagExplorer => vec![DataKind::TagSet, DataKind::Tag],
            Self::ScreenExplorer => vec![DataKind::Screen, DataKind::Plate],
            Self::ImageExplorer => vec![DataKind::Image],
            Self::FileExplorer => vec![DataKind::File],
            Self::AdminExplorer => vec![DataKind::Group],
        }
    }

    /// Whether the top level only lists objects outside any container
    #[must_use]
    pub const fn orphans_only(self) -> bool {
        !matches!(self, Self::ImageExplorer | Self::FileExplorer)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ContainerExplorer => "container-explorer",
            Self::TagExplorer => "tag-explorer",
            Self::ScreenExplorer => "screen-explorer",
            Self::ImageExplorer => "image-explorer",
            Self::FileExplorer => "file-explorer",
            Self::AdminExplorer => "admin-explorer",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
