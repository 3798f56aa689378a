use crate::app::ports::{AttributeResolver, PageFetcher, Resolution};
use crate::config::ScraperConfig;
use crate::error::{LookupError, PipelineError, Result};
use crate::infra::http_client::ReqwestHttp;
use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument, warn};

/// Looks up a model's body type on auto-data.net: one search request per
/// call, value read from the first `span.additional` element's `strong`
/// child.
pub struct AutoDataResolver<F: PageFetcher = ReqwestHttp> {
    fetcher: F,
    search_url: Url,
    search_param: String,
    container: Selector,
    value: Selector,
}

impl AutoDataResolver<ReqwestHttp> {
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let fetcher = ReqwestHttp::new(config.request_timeout())?;
        Self::new(
            fetcher,
            &config.search_url,
            &config.search_param,
            &config.container_selector,
            &config.value_selector,
        )
    }
}

impl<F: PageFetcher> AutoDataResolver<F> {
    pub fn new(
        fetcher: F,
        search_url: &str,
        search_param: &str,
        container_selector: &str,
        value_selector: &str,
    ) -> Result<Self> {
        let search_url = Url::parse(search_url)
            .map_err(|e| PipelineError::Config(format!("Invalid search URL '{search_url}': {e}")))?;
        Ok(Self {
            fetcher,
            search_url,
            search_param: search_param.to_string(),
            container: parse_selector(container_selector)?,
            value: parse_selector(value_selector)?,
        })
    }

    /// Search URL for `model`, query-encoded.
    pub fn url_for(&self, model: &str) -> String {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair(&self.search_param, model);
        url.to_string()
    }

    /// Text of the first value element inside the first container element.
    pub fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let container = document.select(&self.container).next()?;
        let value = container.select(&self.value).next()?;
        let text = value.text().collect::<String>().trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| PipelineError::Config(format!("Invalid CSS selector '{selector}': {e}")))
}

#[async_trait]
impl<F: PageFetcher> AttributeResolver for AutoDataResolver<F> {
    #[instrument(skip(self))]
    async fn resolve(&self, model: &str) -> Resolution {
        let url = self.url_for(model);
        debug!("Fetching {}", url);

        let body = match self.fetcher.get(&url).await {
            Ok(body) => body,
            Err(message) => {
                let err = LookupError::Fetch {
                    model: model.to_string(),
                    message,
                };
                error!("{}", err);
                return Resolution::NotFound(err);
            }
        };

        match self.extract(&body) {
            Some(vehicle_type) => {
                info!("Found: {} -> {}", model, vehicle_type);
                Resolution::Found(vehicle_type)
            }
            None => {
                let err = LookupError::Parse {
                    model: model.to_string(),
                    message: "no body type element on the results page".to_string(),
                };
                warn!("{}", err);
                Resolution::NotFound(err)
            }
        }
    }
}
