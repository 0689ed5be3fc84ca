// Choosing which of a bible's filesets the reader works with

use crate::dbp_client::{Bible, Fileset, FilesetKind};

/// Filesets usable for one bible, split the ways the resolution flow needs them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilesetSelection {
    pub filesets: Vec<Fileset>,
    pub has_video: bool,
    pub active_fileset_id: String,
    pub plain_ids: Vec<String>,
    pub formatted_ids: Vec<String>,
    /// One fileset per type (the last listed), types in order of first appearance.
    pub book_list_sources: Vec<(FilesetKind, String)>,
}

// Gideon (GID) editions and DA16 drama audio are never offered.
fn is_restricted(id: &str) -> bool {
    id.contains("GID") || id.ends_with("DA16")
}

pub fn select_filesets(bible: &Bible, bucket_id: &str, video_bucket_id: &str) -> FilesetSelection {
    let Some(bucket) = bible.filesets.get(bucket_id) else {
        return FilesetSelection::default();
    };
    let video = bible.filesets.get(video_bucket_id);
    let has_video = video.is_some();

    // Only GID editions are passed over here; a DA16 suffix does not disqualify
    // a text fileset from being the active one.
    let active_fileset_id = bucket
        .iter()
        .rev()
        .find(|f| !f.id.contains("GID") && f.kind.is_text())
        .map(|f| f.id.clone())
        .unwrap_or_default();

    // A bible with a single fileset is shown whatever that fileset is.
    let only_one = bucket.len() == 1;
    let several = bucket.len() > 1;
    let filesets: Vec<Fileset> = bucket
        .iter()
        .chain(video.into_iter().flatten())
        .filter(|f| {
            only_one
                || (several
                    && !is_restricted(&f.id)
                    && f.kind.is_supported()
                    && f.size.as_deref() != Some("S"))
        })
        .cloned()
        .collect();

    let mut selection = FilesetSelection {
        has_video,
        active_fileset_id,
        ..Default::default()
    };
    for set in &filesets {
        match set.kind {
            FilesetKind::TextFormat => selection.formatted_ids.push(set.id.clone()),
            FilesetKind::TextPlain => selection.plain_ids.push(set.id.clone()),
            _ => {}
        }
        match selection
            .book_list_sources
            .iter_mut()
            .find(|(kind, _)| *kind == set.kind)
        {
            Some((_, id)) => *id = set.id.clone(),
            None => selection
                .book_list_sources
                .push((set.kind.clone(), set.id.clone())),
        }
    }
    selection.filesets = filesets;
    tracing::debug!(
        filesets = selection.filesets.len(),
        has_video,
        plain = selection.plain_ids.len(),
        formatted = selection.formatted_ids.len(),
        "selected filesets"
    );
    selection
}

/// Audio filesets in playback preference order: dramatized first, then plain audio.
pub fn audio_filesets(filesets: &[Fileset]) -> Vec<&Fileset> {
    [FilesetKind::AudioDrama, FilesetKind::Audio]
        .iter()
        .flat_map(|kind| filesets.iter().filter(move |f| f.kind == *kind))
        .collect()
}
