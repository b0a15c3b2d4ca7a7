//! Proxy URL templates.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything `encodeURIComponent` escapes: all but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Rewrites a target URL into a request through a third-party proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRewriter {
    template: String,
}

impl ProxyRewriter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Host of the proxy service, for logs and metric labels.
    pub fn label(&self) -> String {
        url::Url::parse(&self.template.replace("{encoded_url}", "").replace("{url}", ""))
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.template.clone())
    }

    pub fn rewrite(&self, target: &str) -> String {
        self.template
            .replace("{encoded_url}", &encode_component(target))
            .replace("{url}", target)
    }
}

/// Percent-encode a full URL so it can travel as a single query value.
fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_raw() {
        let rewriter = ProxyRewriter::new("https://cors-anywhere.herokuapp.com/{url}");
        assert_eq!(
            rewriter.rewrite("http://34.93.233.94:5020/get_balena_cache_result"),
            "https://cors-anywhere.herokuapp.com/http://34.93.233.94:5020/get_balena_cache_result"
        );
    }

    #[test]
    fn test_rewrite_encoded() {
        let rewriter = ProxyRewriter::new("https://api.allorigins.win/raw?url={encoded_url}");
        assert_eq!(
            rewriter.rewrite("http://10.0.0.1:5020/stats"),
            "https://api.allorigins.win/raw?url=http%3A%2F%2F10.0.0.1%3A5020%2Fstats"
        );
    }

    #[test]
    fn test_encoded_space_is_percent_twenty() {
        let rewriter = ProxyRewriter::new("https://corsproxy.io/?{encoded_url}");
        assert_eq!(
            rewriter.rewrite("http://10.0.0.1/export?sheet=Center List&x=a+b~(1)"),
            "https://corsproxy.io/?http%3A%2F%2F10.0.0.1%2Fexport%3Fsheet%3DCenter%20List%26x%3Da%2Bb~(1)"
        );
    }

    #[test]
    fn test_label_is_proxy_host() {
        let rewriter = ProxyRewriter::new("https://corsproxy.io/?{encoded_url}");
        assert_eq!(rewriter.label(), "corsproxy.io");
    }
}
