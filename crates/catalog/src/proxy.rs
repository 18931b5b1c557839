use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_PROXY_PATH: &str = "/proxy/";

/// Proxy settings as they appear in configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyConfig {
    pub proxy_domains: Vec<String>,
    pub cors_domains: Vec<String>,
    pub always_use_proxy: bool,
}

/// Routes requests to hosts without CORS support through the server-side proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsProxy {
    base: String,
    proxy_domains: Vec<String>,
    cors_domains: Vec<String>,
}

impl CorsProxy {
    /// With `always_use_proxy` the CORS domains are proxied as well.
    pub fn new(proxy_domains: Vec<String>, cors_domains: Vec<String>, always_use_proxy: bool) -> Self {
        let lower = |v: Vec<String>| v.into_iter().map(|d| d.to_ascii_lowercase()).collect::<Vec<_>>();
        let mut proxy_domains = lower(proxy_domains);
        let mut cors_domains = lower(cors_domains);
        if always_use_proxy {
            proxy_domains.append(&mut cors_domains);
        }
        Self {
            base: DEFAULT_PROXY_PATH.to_string(),
            proxy_domains,
            cors_domains,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// True when the host is under a proxy domain and not under a CORS-enabled domain.
    pub fn should_use_proxy(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        matches_domain(&host, &self.proxy_domains) && !matches_domain(&host, &self.cors_domains)
    }

    /// `<base>[_<flag>/]<resource>`
    pub fn get_url(&self, resource: &str, flag: Option<&str>) -> String {
        match flag {
            Some(flag) => format!("{}_{flag}/{resource}", self.base),
            None => format!("{}{resource}", self.base),
        }
    }

    /// `url` rewritten through the proxy when its host needs it, otherwise unchanged.
    pub fn url_for(&self, url: &str) -> String {
        if self.should_use_proxy(url) {
            self.get_url(url, None)
        } else {
            url.to_string()
        }
    }
}

impl Default for CorsProxy {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), false)
    }
}

impl From<ProxyConfig> for CorsProxy {
    fn from(config: ProxyConfig) -> Self {
        Self::new(config.proxy_domains, config.cors_domains, config.always_use_proxy)
    }
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(str::to_ascii_lowercase)
}

fn matches_domain(host: &str, domains: &[String]) -> bool {
    domains.iter().any(|d| host.ends_with(d.as_str()))
}
