use std::collections::HashSet;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use reqwest::blocking::Client;
use tracing::{error, info, warn};

use crate::error::LoadError;
use crate::record::Member;

pub const DEFAULT_MEMBERS_URL: &str =
    "https://geektrust.s3-ap-southeast-1.amazonaws.com/adminui-problem/members.json";

#[derive(Debug)]
pub enum FetchRequest {
    /// Fetch the full member list. `seq` is echoed back so stale answers can be dropped.
    Load { seq: u64 },
}

#[derive(Debug)]
pub enum FetchResponse {
    Loaded { seq: u64, members: Vec<Member> },
    Failed { seq: u64, error: LoadError },
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub url: String,
    pub timeout: Duration,
}

pub fn build_client(timeout: Duration) -> Result<Client, LoadError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub fn start_fetch_worker(
    config: FetchConfig,
    req_rx: Receiver<FetchRequest>,
    resp_tx: Sender<FetchResponse>,
) {
    let client = match build_client(config.timeout) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            // Answer the pending request, then stop; later sends see a closed channel.
            if let Ok(FetchRequest::Load { seq }) = req_rx.recv() {
                let _ = resp_tx.send(FetchResponse::Failed { seq, error: e });
            }
            return;
        }
    };

    while let Ok(req) = req_rx.recv() {
        let resp = match req {
            FetchRequest::Load { seq } => {
                info!(seq, url = %config.url, "fetching members");
                match fetch_members(&client, &config.url) {
                    Ok(members) => {
                        info!(seq, count = members.len(), "members fetched");
                        FetchResponse::Loaded { seq, members }
                    }
                    Err(error) => {
                        warn!(seq, %error, "member fetch failed");
                        FetchResponse::Failed { seq, error }
                    }
                }
            }
        };
        if resp_tx.send(resp).is_err() {
            break;
        }
    }
}

/// GET the member list. Any non-2xx status or undecodable body is a `LoadError`.
pub fn fetch_members(client: &Client, url: &str) -> Result<Vec<Member>, LoadError> {
    let resp = client.get(url).send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            status: status.as_u16(),
        });
    }
    let body = resp.text()?;
    parse_members(&body)
}

/// Decode a JSON array of members, rejecting repeated ids.
pub fn parse_members(body: &str) -> Result<Vec<Member>, LoadError> {
    let members: Vec<Member> = serde_json::from_str(body)?;
    let mut seen = HashSet::with_capacity(members.len());
    for m in &members {
        if !seen.insert(m.id.as_str()) {
            return Err(LoadError::DuplicateId(m.id.clone()));
        }
    }
    Ok(members)
}
