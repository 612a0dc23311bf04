use crate::config::SUPPORTED_IMAGE_EXTENSIONS;
use crate::services::backend::ArchiveEntry;
use crate::state::PageInfo;
use std::fs;
use std::path::Path;

/// Whether `path` has one of the supported image extensions.
pub fn is_supported_image(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext_str| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext_str.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resource-fork and OS metadata entries that archives commonly carry.
fn is_junk_entry(path: &str) -> bool {
    path.starts_with("__MACOSX/")
        || path
            .rsplit('/')
            .next()
            .map(|name| name.starts_with("._") || name.starts_with('.'))
            .unwrap_or(false)
}

/// Turns raw archive entries into the ordered page list of a reader session.
///
/// Directories, metadata entries and non-image files are dropped; the rest is
/// naturally sorted by path ("page2" before "page10") and numbered from zero.
pub fn filter_page_entries<F>(entries: &[ArchiveEntry], page_url: F) -> Vec<PageInfo>
where
    F: Fn(&str) -> String,
{
    let mut paths: Vec<&str> = entries
        .iter()
        .filter(|entry| !entry.is_directory)
        .map(|entry| entry.path.as_str())
        .filter(|path| !is_junk_entry(path) && is_supported_image(path))
        .collect();

    paths.sort_by(|a, b| natord::compare_ignore_case(a, b));

    paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| PageInfo {
            path: path.to_string(),
            index,
            url: page_url(path),
        })
        .collect()
}

/// Lists a directory as archive entries (file names only, non-recursive).
pub fn scan_directory(dir: &Path) -> std::io::Result<Vec<ArchiveEntry>> {
    let entries = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_str()?.to_string();
            Some(ArchiveEntry {
                is_directory: path.is_dir(),
                path: name,
            })
        })
        .collect();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> ArchiveEntry {
        ArchiveEntry {
            path: path.to_string(),
            is_directory: false,
        }
    }

    #[test]
    fn natural_order_treats_numbers_numerically() {
        let entries: Vec<_> = ["page10.jpg", "page2.jpg", "Page1.jpg", "page2b.jpg"]
            .into_iter()
            .map(entry)
            .collect();

        let pages = filter_page_entries(&entries, str::to_string);

        let paths: Vec<_> = pages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["Page1.jpg", "page2.jpg", "page2b.jpg", "page10.jpg"]);
    }

    #[test]
    fn filters_non_images_and_metadata() {
        let entries = vec![
            entry("ComicInfo.xml"),
            entry("__MACOSX/._001.jpg"),
            entry("10.png"),
            entry("2.JPG"),
            entry("notes.txt"),
            entry(".DS_Store"),
            ArchiveEntry {
                path: "extras".to_string(),
                is_directory: true,
            },
        ];

        let pages = filter_page_entries(&entries, |path| format!("/pages/{path}"));

        let paths: Vec<_> = pages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["2.JPG", "10.png"]);
        assert_eq!(pages[1].index, 1);
        assert_eq!(pages[1].url, "/pages/10.png");
    }
}
