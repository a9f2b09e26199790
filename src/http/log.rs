//! This module contains a bunch of small inline modules to make it possible to
//! easily filter out individual log messages with our filter system, e.g. with
//! `filters."bookshelf::http::log::req" = "off"`.


use hyper::{body::Incoming, Request};
use crate::prelude::*;

pub mod req {
    use super::*;

    pub fn log(req: &Request<Incoming>) {
        trace!(
            method = ?req.method(),
            path = req.uri().path_and_query().map_or("", |pq| pq.as_str()),
            "Incoming HTTP request",
        );
    }
}

pub mod headers {
    use super::*;

    pub fn log(req: &Request<Incoming>) {
        if tracing::enabled!(tracing::Level::TRACE) {
            let out = req.headers().iter()
                .map(|(name, value)| {
                    format!("\n  {}: {}", name, String::from_utf8_lossy(value.as_bytes()))
                })
                .collect::<String>();
            trace!("HTTP Headers: {}", out);
        }
    }
}
