//! Client for the upstream media resolver
//!
//! Each job makes exactly one POST to the resolver. The reply is keyed on its
//! `status` field and turned into an [`AcquisitionPlan`] (a URL to stream plus a
//! display filename) or a [`ResolverError`].

use crate::config::ResolverConfig;
use crate::error::{Error, ResolverError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Filename used when the resolver does not provide one
pub const DEFAULT_FILENAME: &str = "download.mp4";

/// How the resolver told us to fetch the media
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanKind {
    /// Direct URL to the media host
    Redirect,
    /// Stream relayed through the resolver itself
    Tunnel,
    /// First entry of a multi-variant picker
    Picker,
}

/// Where to fetch the media from and what to call it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquisitionPlan {
    /// Which response shape produced this plan
    pub kind: PlanKind,
    /// URL to stream the media bytes from
    pub url: String,
    /// Display filename
    pub filename: String,
}

/// Fixed request body sent for every job
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveRequest<'a> {
    url: &'a str,
    video_quality: &'static str,
    audio_format: &'static str,
    audio_bitrate: &'static str,
    filename_style: &'static str,
    download_mode: &'static str,
    youtube_video_codec: &'static str,
    always_proxy: bool,
    disable_metadata: bool,
    tiktok_full_audio: bool,
    tiktok_h265: bool,
    twitter_gif: bool,
    #[serde(rename = "youtubeHLS")]
    youtube_hls: bool,
}

impl<'a> ResolveRequest<'a> {
    fn new(url: &'a str) -> Self {
        Self {
            url,
            video_quality: "max",
            audio_format: "best",
            audio_bitrate: "320",
            filename_style: "pretty",
            download_mode: "auto",
            youtube_video_codec: "h264",
            always_proxy: false,
            disable_metadata: false,
            tiktok_full_audio: true,
            tiktok_h265: false,
            twitter_gif: true,
            youtube_hls: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ResolveResponse {
    Error {
        error: UpstreamError,
    },
    Redirect {
        url: String,
        #[serde(default)]
        filename: Option<String>,
    },
    Tunnel {
        url: String,
        #[serde(default)]
        filename: Option<String>,
    },
    Picker {
        #[serde(default)]
        picker: Vec<PickerItem>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    code: String,
}

#[derive(Debug, Deserialize)]
struct PickerItem {
    url: String,
    #[serde(default)]
    filename: Option<String>,
}

/// HTTP client for the resolver service
#[derive(Clone, Debug)]
pub struct ResolverClient {
    http: reqwest::Client,
    endpoint: Url,
    public_address: Option<String>,
}

impl ResolverClient {
    /// Create a client targeting `config.base_url`
    pub fn new(http: reqwest::Client, config: &ResolverConfig) -> Result<Self> {
        let mut endpoint = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid resolver base URL '{}': {}", config.base_url, e),
            key: Some("resolver.base_url".to_string()),
        })?;

        // The resolver only answers on its root path with a trailing slash
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            http,
            endpoint,
            public_address: config.public_address.clone(),
        })
    }

    /// Endpoint every resolve request is posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Ask the resolver how to fetch `source_url`
    pub async fn resolve(
        &self,
        source_url: &str,
    ) -> std::result::Result<AcquisitionPlan, ResolverError> {
        tracing::debug!(endpoint = %self.endpoint, source_url, "Sending resolve request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&ResolveRequest::new(source_url))
            .send()
            .await
            .map_err(|e| ResolverError::Transport(e.to_string()))?;

        let http_status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ResolverError::Transport(e.to_string()))?;

        let value: Option<serde_json::Value> = serde_json::from_slice(&body).ok();

        if !http_status.is_success() {
            // An error-shaped body still carries the resolver's own code
            if let Some(Ok(ResolveResponse::Error { error })) =
                value.map(serde_json::from_value::<ResolveResponse>)
            {
                return Err(ResolverError::Upstream { code: error.code });
            }
            return Err(ResolverError::HttpStatus {
                status: http_status.as_u16(),
            });
        }

        let Some(value) = value else {
            return Err(ResolverError::Unsupported { status: None });
        };
        let status = value
            .get("status")
            .and_then(|s| s.as_str())
            .map(str::to_string);

        let parsed: ResolveResponse = serde_json::from_value(value).map_err(|e| {
            tracing::debug!(error = %e, ?status, "Malformed resolver response");
            ResolverError::Unsupported {
                status: status.clone(),
            }
        })?;

        let plan = match parsed {
            ResolveResponse::Error { error } => {
                return Err(ResolverError::Upstream { code: error.code });
            }
            ResolveResponse::Redirect { url, filename } => AcquisitionPlan {
                kind: PlanKind::Redirect,
                url,
                filename: filename_or_default(filename),
            },
            ResolveResponse::Tunnel { url, filename } => AcquisitionPlan {
                kind: PlanKind::Tunnel,
                url: self.rewrite_tunnel_url(&url),
                filename: filename_or_default(filename),
            },
            ResolveResponse::Picker { picker } => {
                let first = picker
                    .into_iter()
                    .next()
                    .ok_or(ResolverError::EmptyPicker)?;
                AcquisitionPlan {
                    kind: PlanKind::Picker,
                    url: first.url,
                    filename: filename_or_default(first.filename),
                }
            }
            ResolveResponse::Other => return Err(ResolverError::Unsupported { status }),
        };

        tracing::debug!(kind = ?plan.kind, url = %plan.url, filename = %plan.filename, "Resolved media");
        Ok(plan)
    }

    /// Point tunnel URLs advertised on the public address at the internal one
    ///
    /// URLs that do not parse or that target another host are returned unchanged.
    pub fn rewrite_tunnel_url(&self, raw: &str) -> String {
        let Some(public) = self.public_address.as_deref() else {
            return raw.to_string();
        };
        let Ok(mut url) = Url::parse(raw) else {
            return raw.to_string();
        };

        let authority = match (url.host_str(), url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            _ => return raw.to_string(),
        };
        if !authority.eq_ignore_ascii_case(public) {
            return raw.to_string();
        }

        if url.set_scheme(self.endpoint.scheme()).is_err()
            || url.set_host(self.endpoint.host_str()).is_err()
            || url.set_port(self.endpoint.port()).is_err()
        {
            return raw.to_string();
        }

        tracing::debug!(from = raw, to = %url, "Rewrote tunnel URL to internal resolver address");
        url.to_string()
    }
}

fn filename_or_default(filename: Option<String>) -> String {
    filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
