#![allow(dead_code)]

//! In-memory stand-in for an Islandora REST endpoint, plus helpers for
//! laying out packages on disk.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rest_ingester_core::checksum::ChecksumType;
use rest_ingester_core::config::IngestConfig;
use rest_ingester_core::contract::{
    CreatedObject, DatastreamUpload, NewObject, ObjectState, Presence, RepositoryApi, UploadMode,
    UploadedDatastream,
};
use rest_ingester_core::pid::is_valid_pid;
use rest_ingester_core::relationship::Relationship;
use rest_ingester_core::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ProbeObject(String),
    ProbeDatastream(String, String),
    CreateObject(NewObject),
    UpdateState(String, ObjectState),
    AddRelationship(String, Relationship),
    Upload {
        pid: String,
        dsid: String,
        mode: UploadMode,
        checksum_type: ChecksumType,
    },
    FetchDatastream(String, String),
    CountIssues(String),
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    objects: BTreeMap<String, NewObject>,
    datastreams: BTreeMap<(String, String), Vec<u8>>,
    relationships: Vec<(String, Relationship)>,
    next_id: BTreeMap<String, u64>,
}

/// Records every call and behaves like a well-behaved repository: probes
/// reflect what was created, uploads are stored, thumbnails can be fetched.
/// The `with_*` builders switch on specific failures.
#[derive(Debug, Default)]
pub struct FakeRepository {
    state: Mutex<State>,
    issue_count: Option<u64>,
    failing_namespaces: HashSet<String>,
    corrupt_checksums: bool,
    failing_datastream_probes: bool,
    failing_relationships: bool,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self {
            issue_count: Some(0),
            ..Self::default()
        }
    }

    /// Value returned by `count_issues`; `None` makes the query fail.
    pub fn with_issue_count(mut self, count: Option<u64>) -> Self {
        self.issue_count = count;
        self
    }

    /// Object creation in `namespace` fails with HTTP 500.
    pub fn with_failing_namespace(mut self, namespace: &str) -> Self {
        self.failing_namespaces.insert(namespace.to_string());
        self
    }

    /// Report a wrong checksum for every upload.
    pub fn with_corrupt_checksums(mut self) -> Self {
        self.corrupt_checksums = true;
        self
    }

    /// Every datastream existence probe fails with HTTP 503.
    pub fn with_failing_datastream_probes(mut self) -> Self {
        self.failing_datastream_probes = true;
        self
    }

    /// Every relationship write fails with HTTP 500.
    pub fn with_failing_relationships(mut self) -> Self {
        self.failing_relationships = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn object_pids(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateObject(_)))
            .count()
    }

    pub fn object(&self, pid: &str) -> Option<NewObject> {
        self.state.lock().unwrap().objects.get(pid).cloned()
    }

    pub fn relationships_of(&self, pid: &str) -> Vec<Relationship> {
        self.state
            .lock()
            .unwrap()
            .relationships
            .iter()
            .filter(|(p, _)| p == pid)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Object of the first `predicate` relationship on `pid`.
    pub fn relationship_object(&self, pid: &str, predicate: &str) -> Option<String> {
        self.relationships_of(pid)
            .into_iter()
            .find(|r| r.predicate == predicate)
            .map(|r| r.object)
    }

    pub fn datastream(&self, pid: &str, dsid: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .datastreams
            .get(&(pid.to_string(), dsid.to_string()))
            .cloned()
    }

    pub fn uploads(&self) -> Vec<(String, String, UploadMode)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload { pid, dsid, mode, .. } => Some((pid, dsid, mode)),
                _ => None,
            })
            .collect()
    }

    /// Pretend an object was ingested by an earlier run.
    pub fn seed_object(&self, pid: &str) {
        self.state.lock().unwrap().objects.insert(
            pid.to_string(),
            NewObject {
                namespace: pid.to_string(),
                owner: "admin".into(),
                label: "seeded".into(),
            },
        );
    }

    pub fn seed_datastream(&self, pid: &str, dsid: &str, content: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .datastreams
            .insert((pid.to_string(), dsid.to_string()), content.to_vec());
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn not_found(method: &str, url: String) -> ApiError {
    ApiError::Status {
        method: method.into(),
        url,
        status: 404,
        body: String::new(),
    }
}

#[async_trait]
impl RepositoryApi for FakeRepository {
    async fn probe_object(&self, pid: &str) -> Result<Presence, ApiError> {
        self.record(Call::ProbeObject(pid.to_string()));
        let state = self.state.lock().unwrap();
        Ok(if state.objects.contains_key(pid) {
            Presence::Exists
        } else {
            Presence::NotFound
        })
    }

    async fn probe_datastream(&self, pid: &str, dsid: &str) -> Result<Presence, ApiError> {
        self.record(Call::ProbeDatastream(pid.to_string(), dsid.to_string()));
        if self.failing_datastream_probes {
            return Err(ApiError::Status {
                method: "GET".into(),
                url: format!("fake://object/{pid}/datastream/{dsid}"),
                status: 503,
                body: "unavailable".into(),
            });
        }
        let state = self.state.lock().unwrap();
        Ok(
            if state
                .datastreams
                .contains_key(&(pid.to_string(), dsid.to_string()))
            {
                Presence::Exists
            } else {
                Presence::NotFound
            },
        )
    }

    async fn create_object(&self, req: NewObject) -> Result<CreatedObject, ApiError> {
        self.record(Call::CreateObject(req.clone()));
        if self.failing_namespaces.contains(&req.namespace) {
            return Err(ApiError::Status {
                method: "POST".into(),
                url: "fake://object".into(),
                status: 500,
                body: "creation refused".into(),
            });
        }
        let mut state = self.state.lock().unwrap();
        let pid = if is_valid_pid(&req.namespace) {
            req.namespace.clone()
        } else {
            // Like Fedora's PID generator, never hand out a taken PID.
            loop {
                let next = state.next_id.entry(req.namespace.clone()).or_insert(0);
                *next += 1;
                let candidate = format!("{}:{}", req.namespace, next);
                if !state.objects.contains_key(&candidate) {
                    break candidate;
                }
            }
        };
        state.objects.insert(pid.clone(), req);
        Ok(CreatedObject { pid })
    }

    async fn update_object_state(&self, pid: &str, state: ObjectState) -> Result<(), ApiError> {
        self.record(Call::UpdateState(pid.to_string(), state));
        Ok(())
    }

    async fn add_relationship(&self, pid: &str, rel: &Relationship) -> Result<(), ApiError> {
        self.record(Call::AddRelationship(pid.to_string(), rel.clone()));
        if self.failing_relationships {
            return Err(ApiError::Status {
                method: "POST".into(),
                url: format!("fake://object/{pid}/relationship"),
                status: 500,
                body: "relationship refused".into(),
            });
        }
        self.state
            .lock()
            .unwrap()
            .relationships
            .push((pid.to_string(), rel.clone()));
        Ok(())
    }

    async fn upload_datastream(
        &self,
        req: DatastreamUpload,
    ) -> Result<UploadedDatastream, ApiError> {
        self.record(Call::Upload {
            pid: req.pid.clone(),
            dsid: req.dsid.clone(),
            mode: req.mode,
            checksum_type: req.checksum_type,
        });
        let checksum = if self.corrupt_checksums {
            Some("0000".to_string())
        } else {
            req.checksum_type.digest(&req.content)
        };
        self.state
            .lock()
            .unwrap()
            .datastreams
            .insert((req.pid, req.dsid.clone()), req.content);
        Ok(UploadedDatastream {
            dsid: req.dsid,
            checksum,
        })
    }

    async fn fetch_datastream(&self, pid: &str, dsid: &str) -> Result<Vec<u8>, ApiError> {
        self.record(Call::FetchDatastream(pid.to_string(), dsid.to_string()));
        self.datastream(pid, dsid)
            .ok_or_else(|| not_found("GET", format!("fake://object/{pid}/datastream/{dsid}")))
    }

    async fn count_issues(&self, parent: &str) -> Result<u64, ApiError> {
        self.record(Call::CountIssues(parent.to_string()));
        self.issue_count.ok_or_else(|| ApiError::Transport {
            method: "GET".into(),
            url: "fake://solr".into(),
            message: "search index unavailable".into(),
        })
    }
}

pub fn config(content_model: &str) -> IngestConfig {
    IngestConfig {
        content_model: content_model.into(),
        parent: "islandora:root".into(),
        namespace: None,
        owner: "admin".into(),
        user: "admin".into(),
        token: "secret".into(),
        ..IngestConfig::default()
    }
}

pub fn mods(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<mods xmlns="http://www.loc.gov/mods/v3" xmlns:mods="http://www.loc.gov/mods/v3">
  <titleInfo><title>{title}</title></titleInfo>
</mods>"#
    )
}

pub fn issue_mods(title: &str, date: &str) -> String {
    format!(
        r#"<mods xmlns="http://www.loc.gov/mods/v3">
  <titleInfo><title>{title}</title></titleInfo>
  <originInfo><dateIssued encoding="iso8601">{date}</dateIssued></originInfo>
</mods>"#
    )
}

/// Create `dir` and write each `(name, content)` file into it.
pub fn package(dir: &Path, files: &[(&str, &[u8])]) {
    std::fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        std::fs::write(dir.join(name), content).unwrap();
    }
}
