use std::time::Duration;

use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::{error::Error, util::default_ureq_agent};

pub const FALLBACK_TITLE: &str = "Sebuah Kenangan";
pub const FALLBACK_DESCRIPTION: &str = "Kenangan indah yang tersimpan abadi di dalam hati.";

/// Suggested title and description for an image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub title: String,
    pub description: String,
}

impl Caption {
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_owned(),
            description: FALLBACK_DESCRIPTION.to_owned(),
        }
    }
}

pub trait CaptionService {
    fn describe(&self, image_base64: &str) -> Result<Caption, Error>;
}

/// Ask `service` for a caption.  Never fails: any error is logged and replaced
/// by the fixed fallback caption.
pub fn caption_or_fallback(service: &dyn CaptionService, image_base64: &str) -> Caption {
    match service.describe(image_base64) {
        Ok(caption) => caption,
        Err(err) => {
            log::error!("caption generation failed: {}", err);
            Caption::fallback()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptionRequest<'a> {
    image_base64: &'a str,
}

/// Client of the caption-generation endpoint.
pub struct CaptionClient {
    agent: Agent,
    url: String,
}

impl CaptionClient {
    pub fn new(url: impl Into<String>, proxy_url: Option<&str>, timeout: Duration) -> Self {
        Self {
            agent: default_ureq_agent(proxy_url, timeout),
            url: url.into(),
        }
    }
}

impl CaptionService for CaptionClient {
    fn describe(&self, image_base64: &str) -> Result<Caption, Error> {
        let mut response = self
            .agent
            .post(self.url.as_str())
            .send_json(CaptionRequest { image_base64 })?;
        Ok(response.body_mut().read_json()?)
    }
}
