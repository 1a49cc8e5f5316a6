//! Process specifications.
//!
//! A proc section describes one deployable container: image, resources,
//! ports, routing mountpoints, volumes, backups, logs, and secrets.
//! Loading applies kind-specific rules (web routing, portal services) and
//! derives implicit metadata from the application name and cluster config.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_yaml::Value;
use tracing::debug;

use crate::config::{self, ClusterConfig, LOG_VOLUME, SYSTEM_VOLUMES};
use crate::error::{raw_snippet, ManifestError, ManifestResult};
use crate::path;
use crate::port::PortSpec;
use crate::value::{
    bool_field, field, int_field, is_truthy, scalar_string, str_field, str_field_or_empty,
    string_list, truthy_field,
};

pub const MIN_SETUP_TIME: i64 = 0;
pub const MAX_SETUP_TIME: i64 = 120;
pub const MIN_KILL_TIMEOUT: i64 = 10;
pub const MAX_KILL_TIMEOUT: i64 = 60;

/// Top-level keys recognized as process sections.
const SECTION_KEYWORDS: [&str; 6] = ["worker", "web", "oneshot", "portal", "proc", "service"];

/// True when a top-level manifest key introduces a process section.
pub fn is_proc_section(key: &str) -> bool {
    let first = key.split('.').next().unwrap_or(key);
    SECTION_KEYWORDS.contains(&first)
}

/// Kind of a deployable process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcKind {
    #[default]
    Worker,
    Web,
    Oneshot,
    Portal,
}

impl ProcKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcKind::Worker => "worker",
            ProcKind::Web => "web",
            ProcKind::Oneshot => "oneshot",
            ProcKind::Portal => "portal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "worker" => Some(ProcKind::Worker),
            "web" => Some(ProcKind::Web),
            "oneshot" => Some(ProcKind::Oneshot),
            "portal" => Some(ProcKind::Portal),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mode of a scheduled volume backup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackupMode {
    Full,
    Increment,
}

/// One scheduled backup of a proc volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupEntry {
    /// Qualified owner, `appname.kind.procname`.
    pub procname: String,
    /// Volume path as written in the manifest.
    pub volume: String,
    /// Schedule expression; entries with an empty schedule are never built.
    pub schedule: String,
    pub expire: String,
    pub mode: BackupMode,
    #[serde(rename = "preRun")]
    pub pre_run: String,
    #[serde(rename = "postRun")]
    pub post_run: String,
}

/// Full specification of one process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcSpec {
    pub name: String,
    pub kind: ProcKind,
    pub image: String,
    pub cmd: String,
    pub num_instances: u32,
    pub cpu: u32,
    pub memory: String,
    pub ports: BTreeMap<u16, PortSpec>,
    pub mountpoint: Vec<String>,
    pub https_only: bool,
    pub healthcheck: String,
    pub user: String,
    pub working_dir: String,
    pub dns_search: Vec<String>,
    pub env: Vec<String>,
    /// Normalized volume paths claimed by the proc.
    pub volumes: Vec<String>,
    /// System-managed read-only bind mounts, always present.
    pub system_volumes: Vec<String>,
    /// Normalized secret-file paths.
    pub secret_files: Vec<String>,
    pub service_name: String,
    pub allow_clients: String,
    pub backups: Vec<BackupEntry>,
    pub logs: Vec<String>,
    pub stateful: bool,
    pub setup_time: u32,
    pub kill_timeout: u32,
}

impl ProcSpec {
    /// Load one proc section.
    ///
    /// `key` is either `name` or `kind.name`; `body` is the raw section
    /// mapping. `default_image` overrides the generated release image.
    pub fn load(
        key: &str,
        body: &Value,
        appname: &str,
        meta_version: &str,
        default_image: Option<&str>,
        cluster: &ClusterConfig,
    ) -> ManifestResult<Self> {
        debug!("loading proc section '{}'", key);
        let (name, kind) = Self::identity(key, body)?;
        let qualified = format!("{appname}.{kind}.{name}");

        let image = match str_field(body, "image") {
            Some(image) => image,
            None => match default_image {
                Some(image) => image.to_string(),
                None => {
                    config::default_image_name(appname, "release", meta_version, &cluster.registry)
                }
            },
        };

        let mut dns_search = string_list(body, "dns_search");
        let app_dns = format!("{}.lain", path::app_domain(appname));
        if !dns_search.contains(&app_dns) {
            dns_search.push(app_dns);
        }

        let ports = match truthy_field(body, "port") {
            Some(port_meta) => PortSpec::parse_many(port_meta)?,
            None if kind == ProcKind::Web => {
                let spec = PortSpec::default();
                BTreeMap::from([(spec.port, spec)])
            }
            None => BTreeMap::new(),
        };

        let (mountpoint, https_only, healthcheck) = if kind == ProcKind::Web {
            (
                Self::load_mountpoints(key, body, &name, appname, cluster)?,
                bool_field(body, "https_only", false),
                str_field_or_empty(body, "healthcheck"),
            )
        } else {
            (Vec::new(), false, String::new())
        };

        let (mut volumes, backups) = Self::load_volumes(key, body, &qualified)?;

        let mut logs = Vec::new();
        let logs_meta = string_list(body, "logs");
        for log in &logs_meta {
            if log.starts_with('/') {
                return Err(ManifestError::AbsoluteLogPath {
                    key: key.to_string(),
                    path: log.clone(),
                });
            }
            if !logs.contains(log) {
                logs.push(log.clone());
            }
        }
        if !logs_meta.is_empty() {
            volumes.push(LOG_VOLUME.to_string());
        }

        let (service_name, allow_clients) = if kind == ProcKind::Portal {
            let service_name = str_field(body, "service_name").ok_or_else(|| {
                ManifestError::MissingServiceName {
                    key: key.to_string(),
                    body: raw_snippet(body),
                }
            })?;
            let allow_clients =
                str_field(body, "allow_clients").unwrap_or_else(|| "**".to_string());
            (service_name, allow_clients)
        } else {
            (String::new(), String::new())
        };

        Ok(Self {
            name,
            kind,
            image,
            cmd: str_field_or_empty(body, "cmd"),
            num_instances: int_field(body, "num_instances", 1).max(0) as u32,
            cpu: int_field(body, "cpu", 0).max(0) as u32,
            memory: field(body, "memory")
                .and_then(scalar_string)
                .unwrap_or_else(|| "32m".to_string()),
            ports,
            mountpoint,
            https_only,
            healthcheck,
            user: str_field_or_empty(body, "user"),
            working_dir: str_field(body, "workdir")
                .filter(|w| !w.is_empty())
                .or_else(|| str_field(body, "working_dir"))
                .unwrap_or_default(),
            dns_search,
            env: string_list(body, "env"),
            volumes,
            system_volumes: SYSTEM_VOLUMES.iter().map(ToString::to_string).collect(),
            secret_files: path::resolve_all(&string_list(body, "secret_files")),
            service_name,
            allow_clients,
            backups,
            logs,
            stateful: field(body, "stateful").is_some_and(is_truthy),
            setup_time: int_field(body, "setup_time", 0).clamp(MIN_SETUP_TIME, MAX_SETUP_TIME)
                as u32,
            kill_timeout: int_field(body, "kill_timeout", 10)
                .clamp(MIN_KILL_TIMEOUT, MAX_KILL_TIMEOUT) as u32,
        })
    }

    /// Qualified identifier, `appname.kind.name`.
    pub fn qualified_name(&self, appname: &str) -> String {
        format!("{appname}.{}.{}", self.kind, self.name)
    }

    /// Redeploy patch: overwrite command, resources, and instance count
    /// when present; a `port` field replaces the whole port map.
    pub fn patch(&mut self, payload: &Value) -> ManifestResult<()> {
        if let Some(cmd) = str_field(payload, "cmd") {
            self.cmd = cmd;
        }
        if let Some(cpu) = field(payload, "cpu").and_then(Value::as_i64) {
            self.cpu = cpu.max(0) as u32;
        }
        if let Some(memory) = field(payload, "memory").and_then(scalar_string) {
            self.memory = memory;
        }
        if let Some(n) = field(payload, "num_instances").and_then(Value::as_i64) {
            self.num_instances = n.max(0) as u32;
        }
        if let Some(port_meta) = truthy_field(payload, "port") {
            self.ports = PortSpec::parse_many(port_meta)?;
        }
        Ok(())
    }

    /// Autoscaling patch: copy exactly instance count, cpu, and memory.
    pub fn patch_only_simple_scale_meta(&mut self, other: &ProcSpec) {
        self.num_instances = other.num_instances;
        self.cpu = other.cpu;
        self.memory = other.memory.clone();
    }

    /// Orchestration side-channel document; fields appear only when
    /// non-empty or non-default.
    pub fn annotation(&self) -> String {
        let mut data = serde_json::Map::new();
        if !self.mountpoint.is_empty() {
            data.insert("mountpoint".to_string(), json!(self.mountpoint));
        }
        if self.https_only {
            data.insert("https_only".to_string(), json!(true));
        }
        if !self.service_name.is_empty() {
            data.insert("service_name".to_string(), json!(self.service_name));
        }
        if !self.backups.is_empty() {
            data.insert("backup".to_string(), json!(self.backups));
        }
        if !self.healthcheck.is_empty() {
            data.insert("healthcheck".to_string(), json!(self.healthcheck));
        }
        if !self.logs.is_empty() {
            data.insert("logs".to_string(), json!(self.logs));
        }
        serde_json::Value::Object(data).to_string()
    }

    fn identity(key: &str, body: &Value) -> ManifestResult<(String, ProcKind)> {
        let segments: Vec<&str> = key.split('.').collect();
        match segments.as_slice() {
            [kind_key, name] if !name.is_empty() => {
                // An explicit kind in the key wins over the body's `type`.
                let kind = match ProcKind::from_str(kind_key) {
                    Some(kind) => kind,
                    None => Self::kind_from_body(key, body)?,
                };
                Ok((name.to_string(), kind))
            }
            [name] => match ProcKind::from_str(name) {
                Some(kind) => Ok((name.to_string(), kind)),
                None => Err(ManifestError::InvalidServiceKey {
                    key: key.to_string(),
                    message: "bare section key must name a process kind".to_string(),
                }),
            },
            _ => Err(ManifestError::InvalidServiceKey {
                key: key.to_string(),
                message: "expected 'name' or 'kind.name'".to_string(),
            }),
        }
    }

    fn kind_from_body(key: &str, body: &Value) -> ManifestResult<ProcKind> {
        let declared = str_field(body, "type").unwrap_or_else(|| "worker".to_string());
        ProcKind::from_str(&declared).ok_or_else(|| ManifestError::InvalidServiceKey {
            key: key.to_string(),
            message: format!("unknown process type '{declared}'"),
        })
    }

    /// Mountpoints for a web proc. Defaults are the app domain under every
    /// cluster domain plus `{app_domain}.lain`; a proc named `web` merges
    /// declared entries with the defaults, any other name must declare its
    /// own. Path-prefixed entries expand against every default and are
    /// then dropped (two-phase, no in-place mutation).
    fn load_mountpoints(
        key: &str,
        body: &Value,
        name: &str,
        appname: &str,
        cluster: &ClusterConfig,
    ) -> ManifestResult<Vec<String>> {
        let app_domain = path::app_domain(appname);
        let mut defaults: Vec<String> = cluster
            .domains
            .iter()
            .map(|domain| format!("{app_domain}.{domain}"))
            .collect();
        defaults.push(format!("{app_domain}.lain"));

        let declared: Option<Vec<String>> = field(body, "mountpoint")
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().filter_map(scalar_string).collect::<Vec<_>>())
            .filter(|listed| !listed.is_empty());

        let merged = if name == "web" {
            match declared {
                None => defaults.clone(),
                Some(mut listed) => {
                    for default in &defaults {
                        if !listed.contains(default) {
                            listed.push(default.clone());
                        }
                    }
                    listed
                }
            }
        } else {
            declared.ok_or_else(|| ManifestError::MissingMountpoint {
                key: key.to_string(),
                body: raw_snippet(body),
            })?
        };

        let mut kept = Vec::new();
        let mut derived = Vec::new();
        for entry in &merged {
            if entry.starts_with('/') {
                // a bare "/" is dropped without expansion
                if entry.len() > 1 {
                    for default in &defaults {
                        derived.push(format!("{default}{entry}"));
                    }
                }
            } else {
                kept.push(entry.clone());
            }
        }
        kept.extend(derived);
        Ok(kept)
    }

    /// Volumes and backup declarations. `persistent_dirs` wins over
    /// `volumes` when both are present and non-empty.
    fn load_volumes(
        key: &str,
        body: &Value,
        qualified: &str,
    ) -> ManifestResult<(Vec<String>, Vec<BackupEntry>)> {
        let mut volumes = Vec::new();
        let mut backups = Vec::new();

        let dirs = truthy_field(body, "persistent_dirs").or_else(|| truthy_field(body, "volumes"));
        if let Some(entries) = dirs.and_then(Value::as_sequence) {
            for entry in entries {
                match entry {
                    Value::String(vol) => volumes.push(path::resolve(vol)),
                    Value::Mapping(mapping) => {
                        let Some((vol_key, attrs)) = mapping.iter().next() else {
                            continue;
                        };
                        let Some(vol) = scalar_string(vol_key) else {
                            continue;
                        };
                        if let Some(attrs) = attrs.as_mapping() {
                            for (attr, setting) in attrs {
                                let mode = match attr.as_str() {
                                    Some("backup_full") => BackupMode::Full,
                                    Some("backup_increment") => BackupMode::Increment,
                                    _ => continue,
                                };
                                let schedule = str_field_or_empty(setting, "schedule");
                                if schedule.is_empty() {
                                    continue;
                                }
                                backups.push(BackupEntry {
                                    procname: qualified.to_string(),
                                    volume: vol.clone(),
                                    schedule,
                                    expire: str_field_or_empty(setting, "expire"),
                                    mode,
                                    pre_run: str_field_or_empty(setting, "pre_run"),
                                    post_run: str_field_or_empty(setting, "post_run"),
                                });
                            }
                        }
                        volumes.push(path::resolve(&vol));
                    }
                    _ => {}
                }
            }
        }

        for volume in &volumes {
            if !path::volume_allowed(volume) {
                return Err(ManifestError::InvalidVolume {
                    key: key.to_string(),
                    volume: volume.clone(),
                });
            }
        }
        Ok((volumes, backups))
    }
}
