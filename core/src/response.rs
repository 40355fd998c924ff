//! Fully buffered responses.
//!
//! # Design
//! The body is drained into memory before `Request::execute` returns; no
//! streaming API is exposed. Decoders re-parse the buffered bytes on every
//! call, so the same response can be read as JSON, XML, text and raw bytes
//! independently.

use std::borrow::Cow;
use std::fmt;

use reqwest::{Method, StatusCode, Version};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::headers::HeaderStore;

/// The request that produced a response, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    /// Final URL, after redirects.
    pub url: Url,
    /// Headers as set on the builder when the request was sent.
    pub headers: HeaderStore,
}

/// A materialized HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    version: Version,
    body: Vec<u8>,
    content_length: Option<u64>,
    headers: HeaderStore,
    request: RequestInfo,
}

impl Response {
    /// Drain `resp` into memory. Failing to read the body fails the whole call.
    pub(crate) fn materialize(
        resp: reqwest::blocking::Response,
        method: Method,
        sent_headers: HeaderStore,
    ) -> Result<Self> {
        let status = resp.status();
        let version = resp.version();
        let content_length = resp.content_length();
        let headers = HeaderStore::from_header_map(resp.headers());
        let url = resp.url().clone();
        let body = resp.bytes().map_err(Error::BodyRead)?.to_vec();
        Ok(Self {
            status,
            version,
            body,
            content_length,
            headers,
            request: RequestInfo {
                method,
                url,
                headers: sent_headers,
            },
        })
    }

    /// e.g. `"200 OK"`.
    pub fn status_line(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {reason}", self.status.as_u16()),
            None => self.status.as_u16().to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// e.g. `"HTTP/1.1"`.
    pub fn proto(&self) -> String {
        format!("{:?}", self.version)
    }

    pub fn proto_major(&self) -> u8 {
        self.proto_parts().0
    }

    pub fn proto_minor(&self) -> u8 {
        self.proto_parts().1
    }

    fn proto_parts(&self) -> (u8, u8) {
        match self.version {
            Version::HTTP_09 => (0, 9),
            Version::HTTP_10 => (1, 0),
            Version::HTTP_2 => (2, 0),
            Version::HTTP_3 => (3, 0),
            _ => (1, 1),
        }
    }

    /// Declared `Content-Length`, if the server sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// First value of a response header, or `""`.
    pub fn header(&self, key: &str) -> &str {
        self.headers.get(key)
    }

    pub fn content_type(&self) -> &str {
        self.headers.get("Content-Type")
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body as text with HTML entities unescaped.
    pub fn html(&self) -> String {
        html_escape::decode_html_entities(&self.text()).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn xml<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(quick_xml::de::from_reader(self.body.as_slice())?)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn response(status: u16, body: &str) -> Response {
        let mut headers = HeaderStore::new();
        headers.set("content-type", "text/plain");
        Response {
            status: StatusCode::from_u16(status).unwrap(),
            version: Version::HTTP_11,
            body: body.as_bytes().to_vec(),
            content_length: Some(body.len() as u64),
            headers,
            request: RequestInfo {
                method: Method::GET,
                url: Url::parse("http://localhost/").unwrap(),
                headers: HeaderStore::new(),
            },
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        name: String,
    }

    #[test]
    fn status_and_proto() {
        let r = response(404, "");
        assert_eq!(r.status_line(), "404 Not Found");
        assert_eq!(r.status_code(), 404);
        assert_eq!(r.proto(), "HTTP/1.1");
        assert_eq!((r.proto_major(), r.proto_minor()), (1, 1));
        assert_eq!(r.content_type(), "text/plain");
    }

    #[test]
    fn unknown_status_has_bare_code() {
        assert_eq!(response(599, "").status_line(), "599");
    }

    #[test]
    fn json_then_bytes_are_independent() {
        let body = r#"{"id":7,"name":"seven"}"#;
        let r = response(200, body);
        let item: Item = r.json().unwrap();
        assert_eq!(item, Item { id: 7, name: "seven".to_string() });
        assert_eq!(r.bytes(), body.as_bytes());
        let again: Item = r.json().unwrap();
        assert_eq!(again, item);
    }

    #[test]
    fn bad_json_is_reported() {
        let err = response(200, "not json").json::<Item>().unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn xml_decodes() {
        let r = response(200, "<item><id>3</id><name>three</name></item>");
        let item: Item = r.xml().unwrap();
        assert_eq!(item, Item { id: 3, name: "three".to_string() });
    }

    #[test]
    fn html_unescapes_entities() {
        let r = response(200, "&lt;b&gt;Tom &amp; Jerry&#39;s&lt;/b&gt;");
        assert_eq!(r.html(), "<b>Tom & Jerry's</b>");
        assert_eq!(r.to_string(), "&lt;b&gt;Tom &amp; Jerry&#39;s&lt;/b&gt;");
    }
}
