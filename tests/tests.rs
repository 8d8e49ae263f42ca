use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use anyhow::{bail, Result};
use tempfile::TempDir;
use synapse_installer::*;

type Calls = Rc<RefCell<Vec<(PathBuf, Vec<String>)>>>;

/// Records invocations. Pretends to be an unzip tool by writing a fake
/// loader archive layout into the working directory.
struct FakeRunner {
    calls: Calls,
    statuses: RefCell<VecDeque<Option<i32>>>,
    extracts: bool,
}

impl FakeRunner {
    fn new(calls: &Calls, statuses: &[Option<i32>], extracts: bool) -> Self {
        Self {
            calls: calls.clone(),
            statuses: RefCell::new(statuses.iter().copied().collect()),
            extracts,
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &Path, args: &[String], workdir: &Path) -> std::io::Result<CommandOutput> {
        self.calls.borrow_mut().push((program.to_path_buf(), args.to_vec()));
        let status = self.statuses.borrow_mut().pop_front().unwrap_or(Some(0));
        if status == Some(0) && self.extracts {
            fs::write(workdir.join("Assembly-CSharp.dll"), "patched assembly")?;
            fs::create_dir_all(workdir.join("Synapse").join("plugins").join("nested"))?;
            fs::write(workdir.join("Synapse").join("plugins").join("a.txt"), "new plugin")?;
            fs::write(workdir.join("Synapse").join("plugins").join("nested").join("b.txt"), "nested")?;
            fs::write(workdir.join("Synapse").join("readme.md"), "readme")?;
        }
        Ok(CommandOutput {
            status,
            stdout: "fake output".to_string(),
            stderr: String::new(),
        })
    }
}

struct FakeDownloader {
    requests: Rc<RefCell<Vec<(String, PathBuf)>>>,
}

impl Downloader for FakeDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        self.requests.borrow_mut().push((url.to_string(), dest.to_path_buf()));
        fs::write(dest, b"PK")?;
        Ok(2)
    }
}

struct FailingDownloader;

impl Downloader for FailingDownloader {
    fn fetch(&self, url: &str, _dest: &Path) -> Result<u64> {
        bail!("Failed to download {url}")
    }
}

struct Layout {
    _root: TempDir,
    workdir: PathBuf,
    target: InstallTarget,
}

fn setup(with_assembly: bool) -> Layout {
    let root = TempDir::new().unwrap();
    let workdir = root.path().join("work");
    let binaries = root.path().join("srv").join("game");
    let files = root.path().join("srv").join("cfg");
    fs::create_dir_all(&workdir).unwrap();
    fs::create_dir_all(binaries.join("SCPSL_Data").join("Managed")).unwrap();
    fs::create_dir_all(files.join("Synapse").join("plugins")).unwrap();
    fs::write(files.join("Synapse").join("config.yml"), "user settings").unwrap();
    fs::write(files.join("Synapse").join("plugins").join("a.txt"), "old plugin").unwrap();
    if with_assembly {
        fs::write(assembly_path(&binaries), "vanilla assembly").unwrap();
    }
    Layout {
        workdir,
        target: InstallTarget {
            binaries,
            files,
            archive: None,
            unzip_cmd: None,
            unzip_args: vec![],
            steamcmd: None,
            on_conflict: ConflictPolicy::Overwrite,
        },
        _root: root,
    }
}

#[test]
fn test_install_loader_end_to_end() {
    let layout = setup(true);
    let log = Logger::quiet();
    let calls = Calls::default();
    let requests = Rc::new(RefCell::new(vec![]));
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[], true))
        .with_downloader(FakeDownloader { requests: requests.clone() });

    installer.install_loader().unwrap();

    let archive = layout.workdir.join("Synapse.zip");
    assert_eq!(*requests.borrow(), vec![(SYNAPSE_URL.to_string(), archive.clone())]);
    assert_eq!(
        *calls.borrow(),
        vec![(
            PathBuf::from("unzip"),
            vec!["-o".to_string(), archive.to_string_lossy().into_owned()]
        )]
    );

    let assembly = assembly_path(&layout.target.binaries);
    assert_eq!(fs::read_to_string(&assembly).unwrap(), "patched assembly");
    assert_eq!(fs::read_to_string(backup_path(&assembly)).unwrap(), "vanilla assembly");
    assert!(!layout.workdir.join("Assembly-CSharp.dll").exists());

    let synapse = layout.target.files.join("Synapse");
    assert_eq!(fs::read_to_string(synapse.join("config.yml")).unwrap(), "user settings");
    assert_eq!(fs::read_to_string(synapse.join("plugins").join("a.txt")).unwrap(), "new plugin");
    assert_eq!(fs::read_to_string(synapse.join("plugins").join("nested").join("b.txt")).unwrap(), "nested");
    assert_eq!(fs::read_to_string(synapse.join("readme.md")).unwrap(), "readme");
    assert!(!layout.workdir.join("Synapse").exists());
}

#[test]
fn test_install_loader_creates_missing_files_dir() {
    let mut layout = setup(true);
    layout.target.files = layout.workdir.parent().unwrap().join("fresh-cfg");
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[], true))
        .with_downloader(FakeDownloader { requests: Rc::default() });

    installer.install_loader().unwrap();
    assert!(layout.target.files.join("Synapse").join("plugins").join("a.txt").exists());
}

#[test]
fn test_missing_assembly_halts_before_moving_files() {
    let layout = setup(false);
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[], true))
        .with_downloader(FakeDownloader { requests: Rc::default() });

    let err = installer.install_loader().unwrap_err();
    assert!(format!("{err:#}").contains("likely corrupt"));

    assert!(!assembly_path(&layout.target.binaries).exists());
    assert!(layout.workdir.join("Assembly-CSharp.dll").exists());
    assert!(layout.workdir.join("Synapse").join("readme.md").exists());
    let synapse = layout.target.files.join("Synapse");
    assert_eq!(fs::read_to_string(synapse.join("plugins").join("a.txt")).unwrap(), "old plugin");
    assert!(!synapse.join("readme.md").exists());
}

#[test]
fn test_predownloaded_archive_skips_download() {
    let mut layout = setup(true);
    let archive = layout.workdir.join("custom.zip");
    layout.target.archive = Some(archive.clone());
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[], true))
        .with_downloader(FailingDownloader);

    installer.install_loader().unwrap();
    let calls = calls.borrow();
    assert_eq!(calls[0].1.last().unwrap(), &archive.to_string_lossy().into_owned());
}

#[test]
fn test_download_failure_is_fatal() {
    let layout = setup(true);
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[], true))
        .with_downloader(FailingDownloader);

    assert!(installer.install_loader().is_err());
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_extraction_failure_leaves_assembly() {
    let layout = setup(true);
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[Some(9)], true))
        .with_downloader(FakeDownloader { requests: Rc::default() });

    let err = installer.install_loader().unwrap_err();
    assert!(format!("{err:#}").contains("exit code 9"));
    let assembly = assembly_path(&layout.target.binaries);
    assert_eq!(fs::read_to_string(&assembly).unwrap(), "vanilla assembly");
    assert!(!backup_path(&assembly).exists());
}

#[test]
fn test_custom_unzip_command_on_windows_has_no_fallback() {
    let mut layout = setup(true);
    layout.target.unzip_cmd = Some("bsdtar".to_string());
    layout.target.unzip_args = vec!["-xf".to_string()];
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Windows)
        .with_runner(FakeRunner::new(&calls, &[Some(1)], true))
        .with_downloader(FakeDownloader { requests: Rc::default() });

    assert!(installer.install_loader().is_err());
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, PathBuf::from("bsdtar"));
    assert_eq!(calls[0].1[0], "-xf");
}

#[test]
fn test_install_game_accepts_exit_code_seven() {
    let layout = setup(true);
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[Some(7), Some(0)], false));

    installer.install_game().unwrap();
    let calls = calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], (PathBuf::from("steamcmd"), vec!["+quit".to_string()]));
    assert_eq!(calls[1].1, steamcmd_install_args(&layout.target.binaries));
}

#[test]
fn test_install_game_rejects_unhealthy_steamcmd() {
    let layout = setup(true);
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[Some(8)], false));

    assert!(installer.install_game().is_err());
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn test_install_game_exit_seven_on_update_is_failure() {
    let layout = setup(true);
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Unix)
        .with_runner(FakeRunner::new(&calls, &[Some(0), Some(7)], false));

    assert!(installer.install_game().is_err());
}

#[test]
fn test_install_game_falls_back_to_bundled_on_windows() {
    let layout = setup(true);
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Windows)
        .with_runner(FakeRunner::new(&calls, &[Some(1), Some(0), Some(0)], false));

    installer.install_game().unwrap();
    let bundled = layout.workdir.join("bundled").join("steamcmd.exe");
    let programs: Vec<_> = calls.borrow().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(programs, vec![PathBuf::from("steamcmd"), bundled, PathBuf::from("steamcmd")]);
}

#[test]
fn test_configured_steamcmd_is_used() {
    let mut layout = setup(true);
    layout.target.steamcmd = Some(PathBuf::from("/opt/steam/steamcmd.sh"));
    let log = Logger::quiet();
    let calls = Calls::default();
    let installer = Installer::new(&layout.target, &log, &layout.workdir)
        .with_host(HostFamily::Windows)
        .with_runner(FakeRunner::new(&calls, &[Some(1)], false));

    assert!(installer.install_game().is_err());
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, PathBuf::from("/opt/steam/steamcmd.sh"));
}

mod merge {
    use super::*;
    use walkdir::WalkDir;

    fn files_under(root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn source_tree() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let target = dir.path().join("target");
        fs::create_dir_all(source.join("a").join("b")).unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(source.join("a").join("x.txt"), "x").unwrap();
        fs::write(source.join("a").join("b").join("y.txt"), "y").unwrap();
        (dir, source, target)
    }

    #[test]
    fn test_merge_into_empty_target() {
        let (_dir, source, target) = source_tree();
        let report = merge_dirs(&source, &target, ConflictPolicy::Overwrite, &Logger::quiet()).unwrap();

        assert_eq!(fs::read_to_string(target.join("a").join("x.txt")).unwrap(), "x");
        assert_eq!(fs::read_to_string(target.join("a").join("b").join("y.txt")).unwrap(), "y");
        assert!(!source.join("a").exists());
        assert!(source.exists());
        assert_eq!(report.files_moved, 2);
        assert_eq!(report.dirs_created, 2);
        assert_eq!(report.dirs_removed, 2);
    }

    #[test]
    fn test_merge_overwrites_and_keeps_unrelated() {
        let (_dir, source, target) = source_tree();
        fs::create_dir_all(target.join("a")).unwrap();
        fs::write(target.join("a").join("x.txt"), "stale").unwrap();
        fs::write(target.join("a").join("keep.txt"), "mine").unwrap();

        let report = merge_dirs(&source, &target, ConflictPolicy::Overwrite, &Logger::quiet()).unwrap();

        assert_eq!(fs::read_to_string(target.join("a").join("x.txt")).unwrap(), "x");
        assert_eq!(fs::read_to_string(target.join("a").join("keep.txt")).unwrap(), "mine");
        assert_eq!(report.dirs_created, 1);
        assert_eq!(
            files_under(&target),
            vec![
                PathBuf::from("a").join("b").join("y.txt"),
                PathBuf::from("a").join("keep.txt"),
                PathBuf::from("a").join("x.txt"),
            ]
        );
    }

    #[test]
    fn test_merge_skip_keeps_destination() {
        let (_dir, source, target) = source_tree();
        fs::create_dir_all(target.join("a")).unwrap();
        fs::write(target.join("a").join("x.txt"), "mine").unwrap();

        let report = merge_dirs(&source, &target, ConflictPolicy::Skip, &Logger::quiet()).unwrap();

        assert_eq!(fs::read_to_string(target.join("a").join("x.txt")).unwrap(), "mine");
        assert_eq!(fs::read_to_string(target.join("a").join("b").join("y.txt")).unwrap(), "y");
        assert_eq!(report.files_skipped, 1);
        assert!(!source.join("a").exists());
    }

    #[test]
    fn test_merge_error_policy_stops() {
        let (_dir, source, target) = source_tree();
        fs::create_dir_all(target.join("a")).unwrap();
        fs::write(target.join("a").join("x.txt"), "mine").unwrap();

        let err = merge_dirs(&source, &target, ConflictPolicy::Error, &Logger::quiet()).unwrap_err();

        assert!(err.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(target.join("a").join("x.txt")).unwrap(), "mine");
        assert!(source.join("a").join("x.txt").exists());
    }

    #[test]
    fn test_merge_top_level_files() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("s");
        let target = dir.path().join("t");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(source.join("top.txt"), "top").unwrap();

        merge_dirs(&source, &target, ConflictPolicy::Overwrite, &Logger::quiet()).unwrap();
        assert_eq!(fs::read_to_string(target.join("top.txt")).unwrap(), "top");
        assert!(fs::read_dir(&source).unwrap().next().is_none());
    }
}

mod http {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn serve_once(status: &'static str, body: &'static [u8]) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/synapseinstaller/Synapse.zip", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let _ = write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(body);
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    fn downloader() -> HttpDownloader {
        let client = reqwest::blocking::Client::builder().no_proxy().build().unwrap();
        HttpDownloader::with_client(client)
    }

    #[test]
    fn test_http_download_streams_to_file() {
        const BODY: &[u8] = b"PK\x03\x04 loader bytes";
        let (url, server) = serve_once("200 OK", BODY);
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join(SYNAPSE_ARCHIVE);

        let written = downloader().fetch(&url, &dest).unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /synapseinstaller/Synapse.zip"));
        assert_eq!(written, BODY.len() as u64);
        assert_eq!(fs::read(&dest).unwrap(), BODY);
    }

    #[test]
    fn test_http_error_status_fails() {
        let (url, server) = serve_once("404 Not Found", b"missing");
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join(SYNAPSE_ARCHIVE);

        assert!(downloader().fetch(&url, &dest).is_err());
        server.join().unwrap();
        assert!(!dest.exists());
    }
}
