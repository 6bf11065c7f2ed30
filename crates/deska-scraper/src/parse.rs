//! Selector-driven extraction from the listing and detail pages.

use deska_core::{parse_date, Attachment, Entry};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::ScrapeError;

const BOARD: &str = ".c-office-board";
const BOARD_ITEM: &str = ".c-office-board__content-item";
const DATE_COLUMN: &str = ".c-office-board__col-date";
const NAME_COLUMN: &str = ".c-office-board__col-name-content";
const DETAIL_CARD: &str = ".c-card";
const FILES_WRAPPER: &str = ".c-files-wrapper";

/// Date columns every board item carries: published on, published until.
pub const DATE_COLUMNS_PER_ITEM: usize = 2;

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{css}: {e}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn is_blank_date(value: &str) -> bool {
    matches!(value.trim(), "" | "-" | "–" | "—")
}

/// Extracts one entry per board item, in document order. Detail links are
/// resolved against `base`.
pub fn parse_listing(html: &str, base: &Url) -> Result<Vec<Entry>, ScrapeError> {
    let document = Html::parse_document(html);
    let board = selector(BOARD)?;
    let board_item = selector(BOARD_ITEM)?;
    let date_column = selector(DATE_COLUMN)?;
    let span = selector("span")?;
    let name_column = selector(NAME_COLUMN)?;
    let anchor = selector("a")?;

    let mut entries = Vec::new();
    for board_node in document.select(&board) {
        for item_node in board_node.select(&board_item) {
            let item = entries.len() + 1;

            let columns: Vec<ElementRef<'_>> = item_node.select(&date_column).collect();
            if columns.len() != DATE_COLUMNS_PER_ITEM {
                return Err(ScrapeError::DateFieldCount {
                    item,
                    found: columns.len(),
                });
            }
            let mut values = Vec::with_capacity(DATE_COLUMNS_PER_ITEM);
            for column in columns {
                // First span is the column label, the second holds the date.
                let value = column
                    .select(&span)
                    .nth(1)
                    .map(element_text)
                    .ok_or(ScrapeError::MissingDateValue { item })?;
                values.push(value);
            }

            let published_on = parse_date(&values[0]).map_err(|source| ScrapeError::Date {
                item,
                field: "published_on",
                source,
            })?;
            let published_until = if is_blank_date(&values[1]) {
                None
            } else {
                Some(parse_date(&values[1]).map_err(|source| ScrapeError::Date {
                    item,
                    field: "published_until",
                    source,
                })?)
            };

            let link = item_node
                .select(&name_column)
                .next()
                .and_then(|name| name.select(&anchor).next())
                .ok_or(ScrapeError::MissingDetailLink { item })?;
            let href = link
                .value()
                .attr("href")
                .ok_or(ScrapeError::MissingDetailLink { item })?;
            let entry_url = base.join(href).map_err(|source| ScrapeError::InvalidUrl {
                url: href.to_string(),
                source,
            })?;

            entries.push(Entry::new(
                element_text(link),
                entry_url.to_string(),
                published_on,
                published_until,
            ));
        }
    }

    tracing::debug!(entries = entries.len(), "listing parsed");
    Ok(entries)
}

/// Extracts the file list of a detail page, in document order.
pub fn parse_attachments(html: &str) -> Result<Vec<Attachment>, ScrapeError> {
    let document = Html::parse_document(html);
    let card = selector(DETAIL_CARD)?;
    let files_wrapper = selector(FILES_WRAPPER)?;
    let heading = selector("h3")?;
    let anchor = selector("a")?;

    let mut attachments = Vec::new();
    for card_node in document.select(&card) {
        for wrapper in card_node.select(&files_wrapper) {
            let filename = wrapper
                .select(&heading)
                .next()
                .map(element_text)
                .unwrap_or_default();
            let url = wrapper
                .select(&anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
                .unwrap_or_default()
                .trim()
                .to_string();
            attachments.push(Attachment { filename, url });
        }
    }

    Ok(attachments)
}
