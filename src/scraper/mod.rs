// src/scraper/mod.rs

//! Books to Scrape crawler service.
//!
//! Walks the paged catalogue listing of the demo site, then resolves each
//! book's category from its detail page (the listing doesn't carry it).
//! Detail fetches run with bounded concurrency; a fixed pause between
//! requests keeps the target site comfortable.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{BookRow, ScraperConfig};

const UNKNOWN_CATEGORY: &str = "Unknown";

/// Summary of a scrape run.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub books: Vec<BookRow>,
    pub pages_visited: usize,
    pub page_failures: usize,
    pub detail_failures: usize,
}

/// A book parsed from a listing page, category still unresolved.
#[derive(Debug)]
struct ListingItem {
    row: BookRow,
    detail_url: Option<String>,
}

/// Service for scraping the book catalog.
pub struct BookScraper {
    config: ScraperConfig,
    client: Client,
    base_url: Url,
}

impl BookScraper {
    /// Create a new scraper with the given configuration.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            config: config.clone(),
            client,
            base_url,
        })
    }

    /// Scrape up to `max_pages` listing pages, stopping early when a page
    /// yields no books.
    pub async fn scrape_all(&self, max_pages: usize) -> Result<ScrapeOutcome> {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let concurrency = self.config.max_concurrent.max(1);
        let mut outcome = ScrapeOutcome::default();

        // Stage 1: walk the listing pages sequentially.
        let mut items = Vec::new();
        for page in 1..=max_pages {
            let page_url = self.base_url.join(&format!("catalogue/page-{page}.html"))?;

            match self.fetch_listing(&page_url).await {
                Ok(page_items) => {
                    outcome.pages_visited += 1;
                    if page_items.is_empty() {
                        tracing::info!("Page {page} has no books; stopping");
                        break;
                    }
                    tracing::info!("Page {page}: {} books", page_items.len());
                    items.extend(page_items);
                }
                Err(error) => {
                    outcome.page_failures += 1;
                    tracing::warn!("Failed to fetch listing page {page_url}: {error}");
                    break;
                }
            }

            if page < max_pages && delay.as_millis() > 0 {
                tokio::time::sleep(delay).await;
            }
        }

        // Stage 2: resolve categories from detail pages, bounded concurrency.
        let mut detail_stream = stream::iter(items)
            .map(|item| async move {
                let category = self.resolve_category(item.detail_url.as_deref()).await;
                (item.row, category)
            })
            .buffered(concurrency);

        while let Some((mut row, category)) = detail_stream.next().await {
            match category {
                Ok(category) => row.category = category,
                Err(error) => {
                    outcome.detail_failures += 1;
                    tracing::warn!("Failed to fetch category for '{}': {error}", row.title);
                    row.category = UNKNOWN_CATEGORY.to_string();
                }
            }
            outcome.books.push(row);

            if delay.as_millis() > 0 {
                tokio::time::sleep(delay).await;
            }
        }

        tracing::info!(
            "Scrape finished: {} books from {} pages ({} page failures, {} detail failures)",
            outcome.books.len(),
            outcome.pages_visited,
            outcome.page_failures,
            outcome.detail_failures
        );
        Ok(outcome)
    }

    /// Fetch and parse one listing page.
    async fn fetch_listing(&self, page_url: &Url) -> Result<Vec<ListingItem>> {
        let response = self.client.get(page_url.clone()).send().await?;
        let html = response.error_for_status()?.text().await?;
        parse_listing(&html, page_url)
    }

    /// Fetch a book's detail page and pull the category out of its breadcrumb.
    async fn resolve_category(&self, detail_url: Option<&str>) -> Result<String> {
        let Some(url) = detail_url else {
            return Ok(UNKNOWN_CATEGORY.to_string());
        };
        let response = self.client.get(url).send().await?;
        let html = response.error_for_status()?.text().await?;
        Ok(parse_category(&html).unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()))
    }
}

/// Parse all book rows out of a listing page.
fn parse_listing(html: &str, page_url: &Url) -> Result<Vec<ListingItem>> {
    let document = Html::parse_document(html);

    let article_sel = parse_selector("article.product_pod")?;
    let title_sel = parse_selector("h3 a")?;
    let price_sel = parse_selector("p.price_color")?;
    let rating_sel = parse_selector("p.star-rating")?;
    let avail_sel = parse_selector("p.instock.availability")?;
    let image_sel = parse_selector("img")?;

    let mut items = Vec::new();
    for article in document.select(&article_sel) {
        let Some(title_elem) = article.select(&title_sel).next() else {
            continue;
        };
        let title = title_elem
            .value()
            .attr("title")
            .map(str::to_string)
            .unwrap_or_else(|| element_text(&title_elem));
        if title.is_empty() {
            continue;
        }

        let detail_url = title_elem
            .value()
            .attr("href")
            .and_then(|href| page_url.join(href).ok())
            .map(|url| url.to_string());

        let price = article
            .select(&price_sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        let rating = article
            .select(&rating_sel)
            .next()
            .map(|el| star_rating(el.value().classes()))
            .unwrap_or(0);

        let availability = article
            .select(&avail_sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        let image_url = article
            .select(&image_sel)
            .next()
            .and_then(|el| el.value().attr("src"))
            .and_then(|src| page_url.join(src).ok())
            .map(|url| url.to_string())
            .unwrap_or_default();

        items.push(ListingItem {
            row: BookRow {
                title,
                price,
                rating,
                availability,
                category: String::new(),
                image_url,
            },
            detail_url,
        });
    }
    Ok(items)
}

/// Category from a detail page breadcrumb: Home / Books / {category} / title.
fn parse_category(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let crumb_sel = Selector::parse("ul.breadcrumb a").ok()?;

    let category = document
        .select(&crumb_sel)
        .nth(2)
        .map(|el| element_text(&el))?;
    (!category.is_empty()).then_some(category)
}

/// Decode the star rating from the `star-rating` CSS class words.
fn star_rating<'a>(classes: impl Iterator<Item = &'a str>) -> u8 {
    for class in classes {
        match class {
            "One" => return 1,
            "Two" => return 2,
            "Three" => return 3,
            "Four" => return 4,
            "Five" => return 5,
            _ => {}
        }
    }
    0
}

/// Element text with collapsed whitespace.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_FIXTURE: &str = r#"
        <html><body>
        <article class="product_pod">
            <div class="image_container">
                <a href="a-light-in-the-attic_1000/index.html">
                    <img src="../media/cache/fe/72/attic.jpg" alt="A Light in the Attic" />
                </a>
            </div>
            <p class="star-rating Three"></p>
            <h3><a href="a-light-in-the-attic_1000/index.html" title="A Light in the Attic">A Light in the ...</a></h3>
            <div class="product_price">
                <p class="price_color">£51.77</p>
                <p class="instock availability">
                    <i class="icon-ok"></i>
                    In stock
                </p>
            </div>
        </article>
        <article class="product_pod">
            <p class="star-rating Four"></p>
            <h3><a href="sharp-objects_997/index.html" title="Sharp Objects">Sharp Objects</a></h3>
            <div class="product_price">
                <p class="price_color">£47.82</p>
                <p class="instock availability">In stock</p>
            </div>
        </article>
        </body></html>
    "#;

    const DETAIL_FIXTURE: &str = r#"
        <html><body>
        <ul class="breadcrumb">
            <li><a href="../../index.html">Home</a></li>
            <li><a href="../category/books_1/index.html">Books</a></li>
            <li><a href="../category/books/poetry_23/index.html">Poetry</a></li>
            <li class="active">A Light in the Attic</li>
        </ul>
        </body></html>
    "#;

    fn page_url() -> Url {
        Url::parse("https://books.toscrape.com/catalogue/page-1.html").unwrap()
    }

    #[test]
    fn test_parse_listing_extracts_rows() {
        let items = parse_listing(LISTING_FIXTURE, &page_url()).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0].row;
        assert_eq!(first.title, "A Light in the Attic");
        assert_eq!(first.price, "£51.77");
        assert_eq!(first.rating, 3);
        assert_eq!(first.availability, "In stock");
        assert_eq!(
            first.image_url,
            "https://books.toscrape.com/media/cache/fe/72/attic.jpg"
        );
        assert_eq!(
            items[0].detail_url.as_deref(),
            Some("https://books.toscrape.com/catalogue/a-light-in-the-attic_1000/index.html")
        );

        assert_eq!(items[1].row.rating, 4);
    }

    #[test]
    fn test_parse_listing_empty_page() {
        let items = parse_listing("<html><body></body></html>", &page_url()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_category_from_breadcrumb() {
        assert_eq!(parse_category(DETAIL_FIXTURE).as_deref(), Some("Poetry"));
    }

    #[test]
    fn test_parse_category_missing_breadcrumb() {
        assert!(parse_category("<html><body></body></html>").is_none());
    }

    #[test]
    fn test_star_rating_decoding() {
        assert_eq!(star_rating(["star-rating", "Three"].into_iter()), 3);
        assert_eq!(star_rating(["star-rating", "Five"].into_iter()), 5);
        assert_eq!(star_rating(["star-rating"].into_iter()), 0);
    }
}
