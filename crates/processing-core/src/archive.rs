//! Archive bundle resolution.
//!
//! A bundle is a ZIP whose members follow a naming convention: the base
//! photo or video carries `-main` in its name, the decorative layer carries
//! `-overlay`. Members matching neither are ignored.

use std::io::{Cursor, Read};

use keepsake_common::DuplicatePolicy;

/// Name marker of the overlay stream.
pub const OVERLAY_MARKER: &str = "-overlay";
/// Name marker of the base stream.
pub const BASE_MARKER: &str = "-main";

/// Upper bound on the buffer reserved from a member's declared size. The
/// header comes from a downloaded file and may lie.
const MAX_PREALLOCATION: u64 = 64 << 20;

/// A fully decompressed archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Base stream plus optional overlay resolved from one bundle.
#[derive(Debug, Clone)]
pub struct ArchiveBundle {
    pub base: ArchiveMember,
    pub overlay: Option<ArchiveMember>,
}

/// Role a member plays inside a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Base,
    Overlay,
}

impl MemberRole {
    /// Classify a member by name. The overlay marker is checked first, so a
    /// name carrying both markers is an overlay.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.contains(OVERLAY_MARKER) {
            Some(Self::Overlay)
        } else if name.contains(BASE_MARKER) {
            Some(Self::Base)
        } else {
            None
        }
    }
}

/// Errors that abort a bundle; no output is written for the job.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Unreadable archive: {source}")]
    Unreadable {
        #[from]
        source: zip::result::ZipError,
    },

    #[error("Failed to decompress member {name}: {source}")]
    Member {
        name: String,
        source: std::io::Error,
    },

    #[error("Archive has no base member (expected a name containing '-main')")]
    MissingBase,
}

/// Extract the base and overlay streams from a ZIP bundle.
pub fn resolve_bundle(bytes: &[u8], policy: DuplicatePolicy) -> Result<ArchiveBundle, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut base: Option<ArchiveMember> = None;
    let mut overlay: Option<ArchiveMember> = None;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let Some(role) = MemberRole::from_name(&name) else {
            tracing::trace!(member = %name, "Ignoring archive member without a role");
            continue;
        };

        let slot = match role {
            MemberRole::Base => &mut base,
            MemberRole::Overlay => &mut overlay,
        };
        if slot.is_some() {
            tracing::debug!(member = %name, ?role, ?policy, "Duplicate archive member");
            if policy == DuplicatePolicy::FirstWins {
                continue;
            }
        }

        let mut data = Vec::with_capacity(preallocation(file.size()));
        file.read_to_end(&mut data)
            .map_err(|source| ArchiveError::Member {
                name: name.clone(),
                source,
            })?;
        *slot = Some(ArchiveMember { name, bytes: data });
    }

    let base = base.ok_or(ArchiveError::MissingBase)?;
    Ok(ArchiveBundle { base, overlay })
}

fn preallocation(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATION) as usize
}
