//! Facts about the host a heartbeat describes: identity, OS and uptime.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::Instant,
};

use tracing::{debug, info};

/// Fixed node id, taking precedence over detection.
pub const NODE_ID_ENV: &str = "KQ_NODE_ID";

const STATE_ID_PATH: &str = "/var/lib/kq/node-id";
const HOME_ID_PATH: &str = ".kq/node-id";

static NODE: OnceLock<(String, IdSource)> = OnceLock::new();
static STARTED: OnceLock<Instant> = OnceLock::new();

/// Pin the process start used by [`uptime_seconds`].
pub fn init_uptime() {
    STARTED.get_or_init(Instant::now);
}

pub fn uptime_seconds() -> u64 {
    STARTED.get_or_init(Instant::now).elapsed().as_secs()
}

#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

#[inline]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

/// Where a node id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    Env,
    Pod,
    Container,
    Persisted,
    Generated,
}

/// Id of this node, resolved once per process.
///
/// Order: `KQ_NODE_ID`, pod hostname, container id, stored id, fresh UUID (stored).
pub fn node_id() -> &'static str {
    &NODE
        .get_or_init(|| {
            let (id, source) = resolve_node_id();
            info!(node = %id, ?source, "node id resolved");
            (id, source)
        })
        .0
}

fn resolve_node_id() -> (String, IdSource) {
    if let Ok(id) = std::env::var(NODE_ID_ENV)
        && !id.trim().is_empty()
    {
        return (id.trim().to_string(), IdSource::Env);
    }
    if in_kubernetes()
        && let Some(name) = hostname::get().ok().and_then(|h| h.into_string().ok())
    {
        return (name, IdSource::Pod);
    }
    if let Some(id) = fs::read_to_string("/proc/self/cgroup")
        .ok()
        .and_then(|cgroup| container_id(&cgroup))
    {
        return (id, IdSource::Container);
    }
    stored_or_new_id(&id_files())
}

fn id_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from(STATE_ID_PATH)];
    if let Some(home) = std::env::var_os("HOME") {
        files.push(Path::new(&home).join(HOME_ID_PATH));
    }
    files
}

/// First non-empty id in `files`, else a new UUID written to the first writable file.
fn stored_or_new_id(files: &[PathBuf]) -> (String, IdSource) {
    if let Some(id) = files
        .iter()
        .filter_map(|f| fs::read_to_string(f).ok())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
    {
        return (id, IdSource::Persisted);
    }

    let id = uuid::Uuid::new_v4().to_string();
    let stored = files.iter().find(|f| {
        f.parent().is_none_or(|dir| fs::create_dir_all(dir).is_ok()) && fs::write(f, &id).is_ok()
    });
    match stored {
        Some(file) => debug!(file = %file.display(), "node id stored"),
        None => debug!("node id could not be stored; it will change on restart"),
    }
    (id, IdSource::Generated)
}

fn in_kubernetes() -> bool {
    std::env::var_os("KUBERNETES_SERVICE_HOST").is_some()
        || Path::new("/var/run/secrets/kubernetes.io/serviceaccount").exists()
}

/// Container id from a `/proc/self/cgroup` dump (docker, containerd, podman; v1 and v2).
fn container_id(cgroup: &str) -> Option<String> {
    const SCOPE_PREFIXES: [&str; 3] = ["docker-", "cri-containerd-", "libpod-"];

    cgroup
        .lines()
        .filter_map(|line| line.rsplit(':').next())
        .flat_map(|path| path.split('/').rev())
        .find_map(|segment| {
            let segment = segment.trim_end_matches(".scope");
            let id = SCOPE_PREFIXES
                .iter()
                .find_map(|p| segment.strip_prefix(p))
                .unwrap_or(segment);
            is_container_hash(id).then(|| id.to_string())
        })
}

/// Runtimes name containers by a 64-char hex digest.
fn is_container_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Subset of `/etc/os-release`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub version_id: Option<String>,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    pub fn parse(text: &str) -> Self {
        let mut release = Self::default();
        for line in text.lines().map(str::trim) {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = Some(value.trim_matches(|c| c == '"' || c == '\'').to_string());
            match key {
                "ID" => release.id = value,
                "VERSION_ID" => release.version_id = value,
                "PRETTY_NAME" => release.pretty_name = value,
                _ => {}
            }
        }
        release
    }

    /// `PRETTY_NAME`, else `ID VERSION_ID`, else `None`.
    pub fn label(&self) -> Option<String> {
        if let Some(pretty) = &self.pretty_name {
            return Some(pretty.clone());
        }
        let id = self.id.as_deref()?;
        Some(match &self.version_id {
            Some(version) => format!("{id} {version}"),
            None => id.to_string(),
        })
    }
}

/// OS label for heartbeats; the platform name when os-release is missing.
pub fn os_info() -> String {
    fs::read_to_string("/etc/os-release")
        .ok()
        .and_then(|text| OsRelease::parse(&text).label())
        .unwrap_or_else(|| platform().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "4f0c2a9e6b1d8f3a7c5e2b9d0a6f4c1e8b3d7a2f5c9e0b6d1a4f8c3e7b2d5a9f";

    #[test]
    fn node_id_is_resolved_once() {
        let a = node_id();
        assert_eq!(a, node_id());
        assert!(!a.is_empty());
    }

    #[test]
    fn generated_id_is_stored_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![dir.path().join("nested/node-id")];

        let (first, source) = stored_or_new_id(&files);
        assert_eq!(source, IdSource::Generated);
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), first);
        assert_eq!(stored_or_new_id(&files), (first, IdSource::Persisted));
    }

    #[test]
    fn blank_stored_id_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank");
        let real = dir.path().join("real");
        fs::write(&blank, "  \n").unwrap();
        fs::write(&real, "edge-9\n").unwrap();

        let (id, source) = stored_or_new_id(&[blank, real]);
        assert_eq!(id, "edge-9");
        assert_eq!(source, IdSource::Persisted);
    }

    #[test]
    fn container_id_across_runtimes() {
        for cgroup in [
            format!("0::/system.slice/docker-{HASH}.scope"),
            format!("12:memory:/docker/{HASH}"),
            format!("0::/kubepods/burstable/pod1/cri-containerd-{HASH}.scope"),
            format!("0::/machine.slice/libpod-{HASH}.scope"),
        ] {
            assert_eq!(container_id(&cgroup).as_deref(), Some(HASH), "{cgroup}");
        }
        assert_eq!(container_id("0::/init.scope"), None);
        assert_eq!(container_id("0::/user.slice/user-1000.slice"), None);
    }

    #[test]
    fn os_release_label_prefers_pretty_name() {
        let text = "NAME=\"Ubuntu\"\nID=ubuntu\nVERSION_ID=\"24.04\"\n\
                    PRETTY_NAME=\"Ubuntu 24.04 LTS\"\n";
        let release = OsRelease::parse(text);
        assert_eq!(release.id.as_deref(), Some("ubuntu"));
        assert_eq!(release.label().as_deref(), Some("Ubuntu 24.04 LTS"));

        let bare = OsRelease::parse("ID=alpine\nVERSION_ID=3.20.1\n# comment\n");
        assert_eq!(bare.label().as_deref(), Some("alpine 3.20.1"));
        assert_eq!(OsRelease::parse("").label(), None);
    }
}
