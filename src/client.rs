use futures::{future, Future, Stream};
use hyper;
use hyper::header::AUTHORIZATION;
use hyper::{Body, Client as HyperClient, Request, Response};
use hyper_rustls::HttpsConnector;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json;
use thiserror::Error;
use url::{self, Url};

use std::fmt;

use crate::channel::ChannelId;
use crate::post::{PostId, PostList};
use crate::user::User;

const DNS_WORKER_THREADS: usize = 4;
const TOKEN: &'static str = "token";

#[derive(Debug, Error)]
pub enum Error {
    #[error("http error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("invalid request: {0}")]
    Http(#[from] hyper::http::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("server url must use https")]
    InvalidUrl,
    #[error("server responded with {}: {}", .0.status_code, .0.message)]
    Response(ErrorBody),
    #[error("login response has no session token")]
    MissingToken,
    #[error("session token is not valid ascii")]
    InvalidStr,
}

#[derive(Serialize)]
struct Login {
    login_id: String,
    password: String,
    token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ErrorBody {
    pub id: String,
    pub message: String,
    pub request_id: String,
    pub status_code: i64,
    pub is_oath: bool,
}

pub struct UnauthenticatedClient {
    http: HttpClient,
}

struct SessionToken(String);

impl SessionToken {
    fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

#[derive(Clone)]
struct HttpClient {
    base_url: Url,
    hyper: HyperClient<HttpsConnector<hyper::client::HttpConnector>, hyper::Body>,
}

pub struct Client {
    http: HttpClient,
    session_token: SessionToken,
    user: User,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MattermostClient({})", self.user.username)
    }
}

impl HttpClient {
    fn post<B>(&self, path: &str, body: B) -> impl Future<Item = Response<Body>, Error = Error>
    where
        B: Into<Body>,
    {
        let request = self.base_url.join(path).map_err(Error::from).and_then(|url| {
            debug!("POST {}", url.as_str());
            Request::post(url.as_str())
                .body(body.into())
                .map_err(Error::from)
        });
        self.send(request)
    }

    fn get(&self, path: &str, token: &SessionToken) -> impl Future<Item = Response<Body>, Error = Error> {
        let request = self.base_url.join(path).map_err(Error::from).and_then(|url| {
            debug!("GET {}", url.as_str());
            Request::get(url.as_str())
                .header(AUTHORIZATION, token.bearer())
                .body(Body::empty())
                .map_err(Error::from)
        });
        self.send(request)
    }

    fn send(&self, request: Result<Request<Body>, Error>) -> impl Future<Item = Response<Body>, Error = Error> {
        let hyper = self.hyper.clone();
        future::result(request).and_then(move |request| hyper.request(request).map_err(Error::from))
    }
}

/// Collects a response body, decoding an `ErrorBody` for failed requests.
fn read_json<T>(response: Response<Body>) -> impl Future<Item = T, Error = Error>
where
    T: DeserializeOwned,
{
    let status = response.status();
    response
        .into_body()
        .concat2()
        .map_err(Error::from)
        .and_then(move |body| {
            if status.is_success() {
                serde_json::from_slice::<T>(&body).map_err(Error::from)
            } else {
                warn!("request failed with status {}", status);
                let error = serde_json::from_slice::<ErrorBody>(&body)?;
                Err(Error::Response(error))
            }
        })
}

fn session_token<B>(response: &Response<B>) -> Result<SessionToken, Error> {
    response
        .headers()
        .get(TOKEN)
        .ok_or(Error::MissingToken)
        .and_then(|token| token.to_str().map_err(|_err| Error::InvalidStr))
        .map(|token| SessionToken(token.to_string()))
}

impl UnauthenticatedClient {
    pub fn new(url: Url) -> Result<Self, Error> {
        if url.scheme() != "https" {
            return Err(Error::InvalidUrl);
        }

        // Append the api base
        let url = url.join("/api/v4/")?;

        let https = HttpsConnector::new(DNS_WORKER_THREADS);
        let client: HyperClient<_, hyper::Body> = HyperClient::builder().build(https);

        Ok(UnauthenticatedClient {
            http: HttpClient {
                base_url: url,
                hyper: client,
            },
        })
    }

    /// Consume an UnauthenticatedClient and return a Client if successful
    pub fn authenticate(
        self,
        login_id: String,
        password: String,
        token: Option<String>,
    ) -> impl Future<Item = Client, Error = Error> {
        let body = Login {
            login_id,
            password,
            token,
        };
        let http = self.http;
        let login = http.clone();

        future::result(serde_json::to_string(&body))
            .map_err(Error::from)
            .and_then(move |body| login.post("users/login", body))
            .and_then(|res| {
                debug!("login status {}", res.status());
                let token = session_token(&res);
                read_json::<User>(res).map(|user| (user, token))
            })
            .and_then(move |(user, token)| {
                token.map(|session_token| Client {
                    http,
                    session_token,
                    user,
                })
            })
    }
}

impl Client {
    /// The user this session belongs to.
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn get_posts_for_channel(
        &self,
        channel_id: &ChannelId,
        page: u32,
        per_page: u32,
    ) -> impl Future<Item = PostList, Error = Error> {
        let path = format!(
            "channels/{}/posts?page={}&per_page={}",
            channel_id, page, per_page
        );
        self.http
            .get(&path, &self.session_token)
            .and_then(read_json::<PostList>)
    }

    pub fn get_post_thread(&self, post_id: &PostId) -> impl Future<Item = PostList, Error = Error> {
        let path = format!("posts/{}/thread", post_id);
        self.http
            .get(&path, &self.session_token)
            .and_then(read_json::<PostList>)
    }
}
