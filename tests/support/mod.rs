// ABOUTME: Test support utilities.
// ABOUTME: Node.js app fixtures and a local bare config repository standing in for the platform remote.

use std::fs;
use std::io::Write;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use git2::{Repository, Signature};
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("sectionctl=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A minimal deployable app: manifest, dependencies and some sources.
#[allow(dead_code)]
pub fn node_app() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("package.json"),
        r#"{"name": "hello", "section": {"accountId": 1887, "appId": 7749}}"#,
    )
    .unwrap();
    fs::write(root.join("index.js"), "console.log('hello');\n").unwrap();
    fs::create_dir_all(root.join("lib")).unwrap();
    fs::write(root.join("lib/util.js"), "module.exports = {};\n").unwrap();
    fs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
    fs::write(root.join("node_modules/left-pad/index.js"), "// pad\n").unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    #[cfg(unix)]
    {
        fs::create_dir_all(root.join("node_modules/.bin")).unwrap();
        std::os::unix::fs::symlink("../left-pad/index.js", root.join("node_modules/.bin/pad"))
            .unwrap();
    }
    dir
}

/// `node_app` plus `bytes` of incompressible data, so packing takes a while.
#[allow(dead_code)]
pub fn bulky_node_app(bytes: usize) -> TempDir {
    let dir = node_app();
    let mut file =
        std::io::BufWriter::new(fs::File::create(dir.path().join("node_modules/blob.bin")).unwrap());
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..bytes / 8 {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        file.write_all(&state.to_le_bytes()).unwrap();
    }
    file.flush().unwrap();
    dir
}

/// Paths directly under `dir`.
#[allow(dead_code)]
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// Poll until `dir` is empty. False if it still has entries after `limit`.
#[allow(dead_code)]
pub async fn wait_until_empty(dir: &Path, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if entries(dir).is_empty() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// A git host that takes connections into its backlog and never answers.
#[allow(dead_code)]
pub struct SilentGitHost {
    listener: TcpListener,
}

#[allow(dead_code)]
impl SilentGitHost {
    pub fn start() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").unwrap(),
        }
    }

    /// Value for the `git_url` config key.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.listener.local_addr().unwrap())
    }

    /// Clone URL of the fixture application's config repo.
    pub fn url(&self) -> String {
        format!(
            "{}/account/{ACCOUNT}/application/{APP}/{APP_NAME}.git",
            self.base_url()
        )
    }
}

#[allow(dead_code)]
pub const ACCOUNT: u64 = 1887;
#[allow(dead_code)]
pub const APP: u64 = 7749;
#[allow(dead_code)]
pub const APP_NAME: &str = "www.example.com";
#[allow(dead_code)]
pub const BRANCH: &str = "Production";
#[allow(dead_code)]
pub const MODULE: &str = "nodejs";
#[allow(dead_code)]
pub const OLD_PAYLOAD: &str = "old-payload-id";
#[allow(dead_code)]
pub const IMAGE: &str = "section-nodejs:1.4.2";

/// Descriptor with fields the deploy must leave untouched.
#[allow(dead_code)]
pub const DESCRIPTOR: &str = "{\n\t\"section_payload_id\": \"old-payload-id\",\n\t\"type\": \"nodejs-payload\",\n\t\"limits\": {\"memory\":  512, \"cpu\": 0.50}\n}";

/// Bare repository laid out like an application's config repo on the platform.
#[allow(dead_code)]
pub struct ConfigRemote {
    root: TempDir,
    path: PathBuf,
}

#[allow(dead_code)]
impl ConfigRemote {
    /// Remote with a `nodejs` module descriptor and a proxy chain naming its image.
    pub fn new() -> Self {
        let section_config = format!(
            r#"{{"proxychain": [{{"name": "varnish", "image": "varnish:7.1"}}, {{"name": "{MODULE}", "image": "{IMAGE}"}}]}}"#
        );
        Self::with_files(Some(DESCRIPTOR), Some(&section_config))
    }

    /// Remote whose `nodejs` directory and proxy chain file are optional.
    pub fn with_files(descriptor: Option<&str>, section_config: Option<&str>) -> Self {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join(format!(
            "account/{ACCOUNT}/application/{APP}/{APP_NAME}.git"
        ));
        fs::create_dir_all(&path).unwrap();

        let repo = Repository::init_bare(&path).unwrap();
        let mut top = repo.treebuilder(None).unwrap();
        top.insert(
            "README.md",
            repo.blob(b"# config\n").unwrap(),
            0o100644,
        )
        .unwrap();
        if let Some(descriptor) = descriptor {
            let mut module = repo.treebuilder(None).unwrap();
            module
                .insert(
                    ".section-external-source.json",
                    repo.blob(descriptor.as_bytes()).unwrap(),
                    0o100644,
                )
                .unwrap();
            top.insert(MODULE, module.write().unwrap(), 0o040000).unwrap();
        }
        if let Some(section_config) = section_config {
            top.insert(
                "section.config.json",
                repo.blob(section_config.as_bytes()).unwrap(),
                0o100644,
            )
            .unwrap();
        }

        let tree = repo.find_tree(top.write().unwrap()).unwrap();
        let sig = Signature::now("platform", "platform@example.com").unwrap();
        let reference = format!("refs/heads/{BRANCH}");
        repo.commit(Some(&reference), &sig, &sig, "initial config", &tree, &[])
            .unwrap();
        repo.set_head(&reference).unwrap();

        Self { root, path }
    }

    /// Value for the `git_url` config key.
    pub fn base_url(&self) -> String {
        format!("file://{}", self.root.path().display())
    }

    /// Clone URL of this repository.
    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }

    pub fn repo(&self) -> Repository {
        Repository::open_bare(&self.path).unwrap()
    }

    pub fn head(&self) -> git2::Oid {
        self.repo()
            .find_reference(&format!("refs/heads/{BRANCH}"))
            .unwrap()
            .peel_to_commit()
            .unwrap()
            .id()
    }

    pub fn commit_count(&self) -> usize {
        let repo = self.repo();
        let mut walk = repo.revwalk().unwrap();
        walk.push(self.head()).unwrap();
        walk.count()
    }

    /// Contents of `path` at the branch head.
    pub fn file_at_head(&self, path: &str) -> Option<String> {
        let repo = self.repo();
        let commit = repo.find_commit(self.head()).unwrap();
        let entry = commit.tree().unwrap().get_path(Path::new(path)).ok()?;
        let blob = entry.to_object(&repo).unwrap().peel_to_blob().unwrap();
        Some(String::from_utf8(blob.content().to_vec()).unwrap())
    }

    pub fn descriptor_at_head(&self) -> Option<String> {
        self.file_at_head(&format!("{MODULE}/.section-external-source.json"))
    }
}
