use failure::{Error, ResultExt};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, AUTHORIZATION, USER_AGENT};
use sec::Secret;
use serde_json::{self, Value};
use std::vec::IntoIter;

use crate::errors::FailedRequest;

const AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// How requests authenticate against a provider's API.
#[derive(Debug, Clone)]
pub(crate) enum Auth {
    Basic {
        username: String,
        password: Secret<String>,
    },
    Token(Secret<String>),
}

impl Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match *self {
            Auth::Basic {
                ref username,
                ref password,
            } => request.basic_auth(username, Some(password.reveal_str())),
            Auth::Token(ref token) => {
                request.header(AUTHORIZATION, format!("token {}", token.reveal_str()))
            }
        }
    }
}

/// A single page of results and where to find the one after it.
pub(crate) struct Page<I> {
    pub items: Vec<I>,
    pub next: Option<String>,
}

/// Iterate over every item of a paginated endpoint, lazily fetching pages as
/// they're needed.
///
/// The `parse` callback turns the JSON body of a page (and the URL it came
/// from) into that page's items plus the URL of the next page, so both
/// "follow the `next` link" and "bump a page counter" styles fit.
///
/// The first error ends iteration.
pub(crate) struct Paginated<I, P> {
    client: Client,
    auth: Auth,
    headers: HeaderMap,
    next_endpoint: Option<String>,
    items: IntoIter<I>,
    parse: P,
}

impl<I, P> Paginated<I, P>
where
    P: FnMut(&str, Value) -> Result<Page<I>, Error>,
{
    pub fn new(client: Client, auth: Auth, headers: HeaderMap, endpoint: &str, parse: P) -> Self {
        Paginated {
            client,
            auth,
            headers,
            next_endpoint: Some(String::from(endpoint)),
            items: Vec::new().into_iter(),
            parse,
        }
    }

    fn send_request(&mut self, endpoint: &str) -> Result<Vec<I>, Error> {
        debug!("Sending request to {:?}", endpoint);

        let builder = self
            .client
            .get(endpoint)
            .header(USER_AGENT, AGENT)
            .headers(self.headers.clone());
        let request = self
            .auth
            .apply(builder)
            .build()
            .context("Generated invalid request. This is a bug.")?;

        if log_enabled!(::log::Level::Trace) {
            trace!("Request Headers:");
            for (name, value) in request.headers() {
                if name == AUTHORIZATION {
                    trace!("\t{}: XXXXXXXXXX", name);
                } else {
                    trace!("\t{}: {:?}", name, value);
                }
            }
        }

        let response = self
            .client
            .execute(request)
            .map_err(|e| FailedRequest::transport(endpoint, e))?;

        let status = response.status();
        debug!("Received response ({})", status);

        if !status.is_success() {
            warn!("Request failed with {}", status);
            return Err(FailedRequest::from_status(status, endpoint).into());
        }

        let raw: Value = response
            .json()
            .map_err(|e| FailedRequest::transport(endpoint, e))?;

        if log_enabled!(::log::Level::Trace) {
            trace!("Body:");
            if let Ok(pretty) = serde_json::to_string_pretty(&raw) {
                for line in pretty.lines() {
                    trace!("{}", line);
                }
            }
        }

        let Page { items, next } = (self.parse)(endpoint, raw)?;
        self.next_endpoint = next;

        Ok(items)
    }
}

impl<I, P> Iterator for Paginated<I, P>
where
    P: FnMut(&str, Value) -> Result<Page<I>, Error>,
{
    type Item = Result<I, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(next_item) = self.items.next() {
                return Some(Ok(next_item));
            }

            // a page may be empty and still point at another one
            let next_endpoint = self.next_endpoint.take()?;

            match self.send_request(&next_endpoint) {
                Ok(values) => self.items = values.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn numbers_page(_url: &str, body: Value) -> Result<Page<u32>, Error> {
        let items = serde_json::from_value(body["items"].clone())?;
        let next = body["next"].as_str().map(String::from);

        Ok(Page { items, next })
    }

    fn basic_auth() -> Auth {
        Auth::Basic {
            username: String::from("user"),
            password: Secret::new(String::from("hunter2")),
        }
    }

    #[test]
    fn follow_next_links_until_there_are_none() {
        let mut server = Server::new();
        let second = format!("{}/numbers?page=2", server.url());
        let first_page = server
            .mock("GET", "/numbers")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"items": [1, 2], "next": "{}"}}"#, second))
            .expect(1)
            .create();
        let second_page = server
            .mock("GET", "/numbers")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [3]}"#)
            .expect(1)
            .create();

        let endpoint = format!("{}/numbers?page=1", server.url());
        let got: Vec<u32> = Paginated::new(
            Client::new(),
            basic_auth(),
            HeaderMap::new(),
            &endpoint,
            numbers_page,
        )
        .collect::<Result<_, _>>()
        .unwrap();

        assert_eq!(got, vec![1, 2, 3]);
        first_page.assert();
        second_page.assert();
    }

    #[test]
    fn an_empty_page_with_a_next_link_doesnt_stop_iteration() {
        let mut server = Server::new();
        let second = format!("{}/numbers?page=2", server.url());
        let _first_page = server
            .mock("GET", "/numbers")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(format!(r#"{{"items": [], "next": "{}"}}"#, second))
            .create();
        let _second_page = server
            .mock("GET", "/numbers")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(r#"{"items": [42]}"#)
            .create();

        let endpoint = format!("{}/numbers?page=1", server.url());
        let got: Vec<u32> = Paginated::new(
            Client::new(),
            basic_auth(),
            HeaderMap::new(),
            &endpoint,
            numbers_page,
        )
        .collect::<Result<_, _>>()
        .unwrap();

        assert_eq!(got, vec![42]);
    }

    #[test]
    fn sends_credentials_and_a_user_agent() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/numbers")
            .match_header("authorization", "token s3cr3t")
            .match_header("user-agent", AGENT)
            .with_status(200)
            .with_body(r#"{"items": [7]}"#)
            .expect(1)
            .create();

        let endpoint = format!("{}/numbers", server.url());
        let got: Vec<u32> = Paginated::new(
            Client::new(),
            Auth::Token(Secret::new(String::from("s3cr3t"))),
            HeaderMap::new(),
            &endpoint,
            numbers_page,
        )
        .collect::<Result<_, _>>()
        .unwrap();

        assert_eq!(got, vec![7]);
        mock.assert();
    }

    #[test]
    fn a_failed_request_ends_iteration() {
        let mut server = Server::new();
        let _mock = server.mock("GET", "/numbers").with_status(500).create();

        let endpoint = format!("{}/numbers", server.url());
        let mut pages = Paginated::new(
            Client::new(),
            basic_auth(),
            HeaderMap::new(),
            &endpoint,
            numbers_page,
        );

        let err = pages.next().unwrap().unwrap_err();
        assert!(err.downcast_ref::<FailedRequest>().is_some());
        assert!(pages.next().is_none());
    }
}
