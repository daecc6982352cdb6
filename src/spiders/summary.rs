use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::Error;
use crate::seed::Seed;

/// Anchors whose `href` ends with this are summary documents.
const SUMMARY_LINK_SELECTOR: &str = r#"a[href$="summary.pdf"]"#;

/// Visits each seed's page, picks the first summary PDF linked from it and
/// saves it as `<output_path>/<name>.pdf`.
pub struct SummarySpider {
    http_client: Client,
    output_path: PathBuf,
    accept_error_status: bool,
}

impl SummarySpider {
    pub fn new(options: SummarySpiderOptions) -> anyhow::Result<Self> {
        let SummarySpiderOptions {
            user_agent: user_agent_opt,
            output_path,
            request_timeout_secs,
            accept_error_status,
        } = options;
        let user_agent = user_agent_opt.as_deref().unwrap_or(crate::APP_USER_AGENT);
        ensure_output_dir(&output_path)?;
        let output_path = output_path
            .canonicalize()
            .with_context(|| format!("output path error '{}'", output_path.display()))?;
        tracing::debug!(user_agent, "configuring SummarySpider {:?}", output_path);
        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .brotli(true)
            .gzip(true);
        if request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(request_timeout_secs));
        }
        let http_client = builder.build().context("Building HTTP client")?;
        Ok(Self {
            http_client,
            output_path,
            accept_error_status,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn destination_for(&self, seed: &Seed) -> PathBuf {
        // Equal names overwrite each other. A rooted name stays under
        // output_path.
        let name = seed.name.trim_start_matches(std::path::is_separator);
        self.output_path.join(format!("{}.pdf", name))
    }
}

impl Debug for SummarySpider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SummarySpider {{ /* omitted */ }}")
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SummarySpiderOptions {
    pub user_agent: Option<String>,
    pub output_path: PathBuf,
    pub request_timeout_secs: u64,
    pub accept_error_status: bool,
}

impl Default for SummarySpiderOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            output_path: "./chemicals".into(),
            request_timeout_secs: 120,
            accept_error_status: false,
        }
    }
}

/// A resolved document waiting to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: Url,
    pub destination: PathBuf,
}

#[async_trait]
impl super::Spider for SummarySpider {
    type Item = DownloadTask;

    fn name(&self) -> String {
        String::from("summary")
    }

    #[tracing::instrument(skip(self, seed), fields(id = %seed.id, name = %seed.name))]
    async fn scrape(&self, seed: &Seed) -> Result<Self::Item, Error> {
        let page = Url::parse(&seed.href).map_err(|source| Error::InvalidUrl {
            url: seed.href.clone(),
            source,
        })?;
        tracing::debug!("calling {}", page);
        let response = self
            .http_client
            .get(page.clone())
            .send()
            .await
            .map_err(|err| {
                tracing::debug!("Failed fetching: {:?}", err);
                err
            })?;

        tracing::trace!("response status: {}", response.status());
        if !response.status().is_success() {
            return Err(Error::RequestReturnedError(response.status()));
        }

        let body = response.text().await?;
        let href = find_summary_href(&body)?.ok_or_else(|| Error::NoSummaryLink {
            page: seed.href.clone(),
        })?;
        let url = page.join(&href).map_err(|source| Error::InvalidUrl {
            url: href.clone(),
            source,
        })?;
        tracing::debug!("resolved {}", url);

        Ok(DownloadTask {
            url,
            destination: self.destination_for(seed),
        })
    }

    #[tracing::instrument(skip(self, item), fields(url = %item.url))]
    async fn process(&self, item: Self::Item) -> Result<(), Error> {
        // The file exists before the request goes out; a failed download
        // leaves it empty.
        tracing::debug!("creating file {:?}", item.destination);
        let mut file = tokio::fs::File::create(&item.destination)
            .await
            .map_err(|err| {
                tracing::debug!("failed creating file");
                err
            })?;

        let response = self.http_client.get(item.url).send().await?;
        let status = response.status();
        tracing::trace!("response status: {}", status);
        if !status.is_success() {
            if !self.accept_error_status {
                return Err(Error::RequestReturnedError(status));
            }
            tracing::warn!("saving body of '{}' response", status);
        }

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        tracing::debug!(written, "saved {:?}", item.destination);
        Ok(())
    }
}

/// First `href` in document order that ends in `summary.pdf`.
fn find_summary_href(html: &str) -> Result<Option<String>, Error> {
    let selector = Selector::parse(SUMMARY_LINK_SELECTOR)
        .map_err(|err| Error::Internal(format!("bad selector: {:?}", err)))?;
    let document = Html::parse_document(html);
    let href = document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(String::from);
    Ok(href)
}

/// Creates the output directory if missing. New directories are private to
/// the current user.
fn ensure_output_dir(path: &Path) -> anyhow::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(path)
        .with_context(|| format!("can't create output path '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::spiders::Spider;

    fn spider_in(dir: &TempDir, accept_error_status: bool) -> SummarySpider {
        SummarySpider::new(SummarySpiderOptions {
            output_path: dir.path().join("chemicals"),
            accept_error_status,
            ..Default::default()
        })
        .unwrap()
    }

    fn seed(href: String, name: &str) -> Seed {
        Seed {
            id: "1".into(),
            href,
            name: name.into(),
        }
    }

    async fn serve_page(server: &MockServer, route: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(server)
            .await;
    }

    #[test]
    fn picks_first_matching_anchor() {
        let html = r#"<html><body>
            <a href="https://x/y/other.pdf">other</a>
            <a href="https://x/y/summary.pdf">first</a>
            <a href="https://x/z/summary.pdf">second</a>
        </body></html>"#;
        assert_eq!(
            find_summary_href(html).unwrap().as_deref(),
            Some("https://x/y/summary.pdf")
        );
    }

    #[test]
    fn no_matching_anchor() {
        let html = r#"<a href="summary.pdf.html">nope</a><a>no href</a>"#;
        assert_eq!(find_summary_href(html).unwrap(), None);
    }

    #[test]
    fn rooted_names_stay_in_output_directory() {
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);

        let destination = spider.destination_for(&seed(String::new(), "/tmp/escaped"));

        assert!(destination.starts_with(spider.output_path()));
        assert_eq!(destination, spider.output_path().join("tmp/escaped.pdf"));
    }

    #[test]
    fn creates_output_directory() {
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);
        assert!(spider.output_path().is_dir());
        // A second spider on the same directory is fine.
        spider_in(&dir, false);
    }

    #[tokio::test]
    async fn scrape_resolves_absolute_link() {
        let server = MockServer::start().await;
        serve_page(&server, "/page1", r#"<a href="https://x/y/summary.pdf">Summary</a>"#).await;
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);

        let task = spider
            .scrape(&seed(format!("{}/page1", server.uri()), "acetone"))
            .await
            .unwrap();

        assert_eq!(task.url.as_str(), "https://x/y/summary.pdf");
        assert_eq!(task.destination, spider.output_path().join("acetone.pdf"));
    }

    #[tokio::test]
    async fn scrape_resolves_relative_link_against_page() {
        let server = MockServer::start().await;
        serve_page(
            &server,
            "/chem/page1",
            r#"<a href="docs/summary.pdf">Summary</a>"#,
        )
        .await;
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);

        let task = spider
            .scrape(&seed(format!("{}/chem/page1", server.uri()), "a"))
            .await
            .unwrap();

        assert_eq!(
            task.url.as_str(),
            format!("{}/chem/docs/summary.pdf", server.uri())
        );
    }

    #[tokio::test]
    async fn scrape_fails_without_summary_link() {
        let server = MockServer::start().await;
        serve_page(&server, "/page1", r#"<a href="/report.pdf">Report</a>"#).await;
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);

        let err = spider
            .scrape(&seed(format!("{}/page1", server.uri()), "a"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoSummaryLink { .. }));
        assert!(!spider.output_path().join("a.pdf").exists());
    }

    #[tokio::test]
    async fn scrape_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);

        let err = spider
            .scrape(&seed(format!("{}/page1", server.uri()), "a"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RequestReturnedError(status) if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn scrape_rejects_empty_href() {
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);
        let err = spider.scrape(&seed(String::new(), "a")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn process_streams_body_to_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/y/summary.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);
        let destination = spider.output_path().join("acetone.pdf");

        spider
            .process(DownloadTask {
                url: Url::parse(&format!("{}/y/summary.pdf", server.uri())).unwrap(),
                destination: destination.clone(),
            })
            .await
            .unwrap();

        assert_eq!(fs::read(destination).unwrap(), b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn process_error_status_leaves_empty_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, false);
        let destination = spider.output_path().join("a.pdf");

        let err = spider
            .process(DownloadTask {
                url: Url::parse(&format!("{}/summary.pdf", server.uri())).unwrap(),
                destination: destination.clone(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RequestReturnedError(_)));
        assert_eq!(fs::metadata(destination).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn process_can_keep_error_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let spider = spider_in(&dir, true);
        let destination = spider.output_path().join("a.pdf");

        spider
            .process(DownloadTask {
                url: Url::parse(&format!("{}/summary.pdf", server.uri())).unwrap(),
                destination: destination.clone(),
            })
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(destination).unwrap(), "oops");
    }
}
