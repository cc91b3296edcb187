//! Non-interactive batch driver: walk the talk pages transcluding the
//! article history template, merge each one, save, and report. Generic over
//! [`PageStore`] so the loop is testable without a wiki.

use anyhow::Result;
use serde::Serialize;

use crate::banner::has_redundant_banner;
use crate::merge::merge_page;
use crate::remote::{NS_TALK, PageStore};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub template: String,
    pub summary: String,
    /// Start the edit counter here (edits already made in earlier runs).
    pub start_count: usize,
    /// Stop once the counter reaches this.
    pub limit: Option<usize>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchPageResult {
    pub title: String,
    pub action: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub edits: usize,
    pub errors: Vec<String>,
    pub pages: Vec<BatchPageResult>,
    pub request_count: usize,
}

pub fn merge_batch<S: PageStore>(store: &mut S, options: &BatchOptions) -> Result<BatchReport> {
    let titles = store.get_embedded_pages(&options.template, NS_TALK)?;
    let mut report = BatchReport {
        dry_run: options.dry_run,
        scanned: titles.len(),
        edits: options.start_count,
        errors: Vec::new(),
        pages: Vec::new(),
        request_count: 0,
    };

    for title in titles {
        let page = match store.get_page(&title) {
            Ok(Some(page)) => page,
            Ok(None) => continue,
            Err(error) => {
                report.errors.push(format!("{title}: {error:#}"));
                continue;
            }
        };
        if !has_redundant_banner(&page.content) {
            continue;
        }

        let updated = match merge_page(&page.content) {
            Ok(updated) => updated,
            Err(error) => {
                report.errors.push(format!("{title}: {error}"));
                report.pages.push(BatchPageResult {
                    title,
                    action: "error".to_string(),
                    detail: Some(error.to_string()),
                });
                continue;
            }
        };
        if updated == page.content {
            report.pages.push(BatchPageResult {
                title,
                action: "unchanged".to_string(),
                detail: None,
            });
            continue;
        }

        if options.dry_run {
            report.pages.push(BatchPageResult {
                title,
                action: "would-edit".to_string(),
                detail: None,
            });
            continue;
        }

        match store.save_page(&title, &updated, &options.summary) {
            Ok(()) => {
                report.edits += 1;
                report.pages.push(BatchPageResult {
                    title,
                    action: "edited".to_string(),
                    detail: None,
                });
            }
            Err(error) => {
                report.errors.push(format!("{title}: {error:#}"));
                report.pages.push(BatchPageResult {
                    title,
                    action: "error".to_string(),
                    detail: Some(format!("{error:#}")),
                });
                continue;
            }
        }

        if let Some(limit) = options.limit
            && report.edits >= limit
        {
            break;
        }
    }

    report.request_count = store.request_count();
    Ok(report)
}

/// Titles of talk pages that transclude the template and still carry a
/// redundant banner in their lead.
pub fn candidate_pages<S: PageStore>(
    store: &mut S,
    template: &str,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let titles = store.get_embedded_pages(template, NS_TALK)?;
    let mut found = Vec::new();
    for title in titles {
        let Some(page) = store.get_page(&title)? else {
            continue;
        };
        if !has_redundant_banner(&page.content) {
            continue;
        }
        found.push(title);
        if let Some(limit) = limit
            && found.len() >= limit
        {
            break;
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{BatchOptions, candidate_pages, merge_batch};
    use crate::remote::{PageStore, RemotePage};

    #[derive(Default)]
    struct MockStore {
        embedded: Vec<String>,
        pages: BTreeMap<String, String>,
        edited: Vec<(String, String, String)>,
        request_count: usize,
    }

    impl PageStore for MockStore {
        fn get_page(&mut self, title: &str) -> anyhow::Result<Option<RemotePage>> {
            self.request_count += 1;
            Ok(self.pages.get(title).map(|content| RemotePage {
                title: title.to_string(),
                content: content.clone(),
                timestamp: "2026-01-01T00:00:00Z".to_string(),
                revision_id: 1,
            }))
        }

        fn get_embedded_pages(
            &mut self,
            _template: &str,
            _namespace: i32,
        ) -> anyhow::Result<Vec<String>> {
            self.request_count += 1;
            Ok(self.embedded.clone())
        }

        fn login(&mut self, _username: &str, _password: &str) -> anyhow::Result<()> {
            self.request_count += 1;
            Ok(())
        }

        fn save_page(&mut self, title: &str, content: &str, summary: &str) -> anyhow::Result<()> {
            self.request_count += 1;
            self.edited
                .push((title.to_string(), content.to_string(), summary.to_string()));
            self.pages.insert(title.to_string(), content.to_string());
            Ok(())
        }

        fn request_count(&self) -> usize {
            self.request_count
        }
    }

    fn options() -> BatchOptions {
        BatchOptions {
            template: "Template:Article history".to_string(),
            summary: "merging banners".to_string(),
            start_count: 0,
            limit: None,
            dry_run: false,
        }
    }

    fn store_with(pages: &[(&str, &str)]) -> MockStore {
        let mut store = MockStore::default();
        for (title, content) in pages {
            store.embedded.push((*title).to_string());
            store.pages.insert((*title).to_string(), (*content).to_string());
        }
        store
    }

    const MERGEABLE: &str = "{{Article history}}\n{{ITN talk|date1=1 June 2009}}";
    const CLEAN: &str = "{{Article history|currentstatus=GA}}\nNo banners here.";
    const BROKEN: &str = "{{Article history}}\n{{ITN talk|date1=whenever it was}}";

    #[test]
    fn merges_only_pages_with_redundant_banners() {
        let mut store = store_with(&[("Talk:Alpha", MERGEABLE), ("Talk:Beta", CLEAN)]);
        let report = merge_batch(&mut store, &options()).expect("batch");
        assert_eq!(report.scanned, 2);
        assert_eq!(report.edits, 1);
        assert_eq!(store.edited.len(), 1);
        assert_eq!(store.edited[0].0, "Talk:Alpha");
        assert!(store.edited[0].1.contains("|itndate=1 June 2009"));
        assert_eq!(store.edited[0].2, "merging banners");
    }

    #[test]
    fn edit_limit_counts_from_the_starting_number() {
        let mut store = store_with(&[("Talk:Alpha", MERGEABLE), ("Talk:Beta", MERGEABLE)]);
        let report = merge_batch(
            &mut store,
            &BatchOptions {
                start_count: 4,
                limit: Some(5),
                ..options()
            },
        )
        .expect("batch");
        assert_eq!(report.edits, 5);
        assert_eq!(store.edited.len(), 1);
    }

    #[test]
    fn dry_run_makes_no_edits() {
        let mut store = store_with(&[("Talk:Alpha", MERGEABLE)]);
        let report = merge_batch(
            &mut store,
            &BatchOptions {
                dry_run: true,
                ..options()
            },
        )
        .expect("batch");
        assert_eq!(report.edits, 0);
        assert!(store.edited.is_empty());
        assert_eq!(report.pages[0].action, "would-edit");
    }

    #[test]
    fn one_broken_page_does_not_stop_the_batch() {
        let mut store = store_with(&[("Talk:Alpha", BROKEN), ("Talk:Beta", MERGEABLE)]);
        let report = merge_batch(&mut store, &options()).expect("batch");
        assert_eq!(report.edits, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Talk:Alpha:"));
        assert_eq!(store.edited[0].0, "Talk:Beta");
    }

    #[test]
    fn missing_pages_are_skipped() {
        let mut store = store_with(&[("Talk:Alpha", MERGEABLE)]);
        store.embedded.push("Talk:Ghost".to_string());
        let report = merge_batch(&mut store, &options()).expect("batch");
        assert_eq!(report.scanned, 2);
        assert_eq!(report.edits, 1);
    }

    #[test]
    fn candidate_pages_lists_only_pages_still_carrying_banners() {
        let mut store = store_with(&[
            ("Talk:Alpha", MERGEABLE),
            ("Talk:Beta", CLEAN),
            ("Talk:Gamma", MERGEABLE),
        ]);
        let all = candidate_pages(&mut store, "Template:Article history", None).expect("list");
        assert_eq!(all, vec!["Talk:Alpha".to_string(), "Talk:Gamma".to_string()]);

        let capped = candidate_pages(&mut store, "Template:Article history", Some(1)).expect("list");
        assert_eq!(capped, vec!["Talk:Alpha".to_string()]);
    }
}
