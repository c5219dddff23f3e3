use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use appstage_app::{FailureKind, Orchestrator, RunOptions, RunOutcome, StepStatus};
use appstage_config::{AppDescriptor, VersionCheck};
use appstage_fetch::{FetchSettings, HttpFetcher};
use appstage_stage::{PackageInstaller, StageError, StageResult};
use appstage_telemetry::Metrics;
use appstage_test_support::fixtures::{ZipEntry, temp_dir, write_zip_archive, zip_descriptor};
use async_trait::async_trait;
use httpmock::prelude::*;

struct NoInstaller;

#[async_trait]
impl PackageInstaller for NoInstaller {
    async fn administrative_extract(&self, _package: &Path, _target: &Path) -> StageResult<()> {
        Ok(())
    }
}

/// Unpacks a fixed tree under `SourceDir/App` the way an administrative install would.
struct TreeInstaller;

#[async_trait]
impl PackageInstaller for TreeInstaller {
    async fn administrative_extract(&self, _package: &Path, target: &Path) -> StageResult<()> {
        let root = target.join("SourceDir").join("App");
        let lib = root.join("lib");
        fs::create_dir_all(&lib).map_err(|source| StageError::Io {
            operation: "tree_installer.create",
            path: lib.clone(),
            source,
        })?;
        for (path, body) in [
            (root.join("app.exe"), "exe"),
            (lib.join("core.dll"), "dll"),
            (root.join("license.rtf"), "rtf"),
        ] {
            fs::write(&path, body).map_err(|source| StageError::Io {
                operation: "tree_installer.write",
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn orchestrator(installer: Arc<dyn PackageInstaller>) -> Result<(Orchestrator, Metrics)> {
    let metrics = Metrics::new()?;
    let fetcher = HttpFetcher::new(FetchSettings::default())?;
    Ok((Orchestrator::new(fetcher, installer, metrics.clone()), metrics))
}

fn options(base_dir: &Path) -> RunOptions {
    RunOptions {
        base_dir: base_dir.to_path_buf(),
        ..RunOptions::default()
    }
}

fn app_zip(dir: &Path) -> Result<Vec<u8>> {
    let archive = dir.join("fixture.zip");
    write_zip_archive(
        &archive,
        &[
            ZipEntry::File("app-1.2/readme.txt", b"read me"),
            ZipEntry::File("app-1.2/bin/app.exe", b"binary"),
            ZipEntry::File("app-1.2/bin/helper.dll", b"library"),
        ],
    )?;
    let bytes = fs::read(&archive)?;
    fs::remove_file(&archive)?;
    Ok(bytes)
}

fn app_descriptor(server: &MockServer) -> AppDescriptor {
    let mut descriptor = zip_descriptor(
        "App-{{VERSION}}",
        "1.2",
        &server.url("/{{VERSION}}.zip"),
    );
    descriptor.extract_patterns = vec![r"\.exe$".to_string(), r"\.dll$".to_string()];
    descriptor
}

fn base_dir(root: &Path) -> Result<PathBuf> {
    let base = root.join("stage");
    fs::create_dir(&base)?;
    Ok(base)
}

#[tokio::test]
async fn zip_run_stages_only_selected_entries() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let bytes = app_zip(temp.path())?;
    let server = MockServer::start_async().await;
    let download = server.mock(|when, then| {
        when.method(GET).path("/1.2.zip");
        then.status(200).body(bytes.clone());
    });

    let (orchestrator, metrics) = orchestrator(Arc::new(NoInstaller))?;
    let report = orchestrator
        .run(&app_descriptor(&server), &options(&base))
        .await?;

    download.assert();
    let final_folder = base.join("App-1.2");
    assert_eq!(report.outcome, RunOutcome::Staged);
    assert_eq!(report.final_folder, final_folder);
    assert_eq!(report.archive_path, base.join("App-1.2.zip"));
    assert_eq!(report.bytes_downloaded, bytes.len() as u64);
    assert!(!report.archive_reused);
    assert_eq!(fs::read(final_folder.join("bin").join("app.exe"))?, b"binary");
    assert!(final_folder.join("bin").join("helper.dll").is_file());
    assert!(!final_folder.join("readme.txt").exists());
    assert!(!base.join("app-1.2").exists());

    let names: Vec<&str> = report.steps.iter().map(|step| step.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "validate",
            "resolve_version",
            "check_existing",
            "fetch",
            "extract",
            "post_process",
            "promote"
        ]
    );
    assert!(
        report
            .steps
            .iter()
            .all(|step| step.status != StepStatus::Failed)
    );

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.runs_staged_total, 1);
    assert_eq!(snapshot.download_bytes_total, bytes.len() as u64);
    Ok(())
}

#[tokio::test]
async fn existing_archive_ends_run_without_network() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    fs::write(base.join("App-1.2.zip"), b"cached")?;
    let server = MockServer::start_async().await;
    let download = server.mock(|when, then| {
        when.method(GET).path("/1.2.zip");
        then.status(200).body("fresh");
    });

    let (orchestrator, metrics) = orchestrator(Arc::new(NoInstaller))?;
    let report = orchestrator
        .run(&app_descriptor(&server), &options(&base))
        .await?;

    download.assert_hits(0);
    assert_eq!(report.outcome, RunOutcome::UpToDate);
    assert_eq!(report.bytes_downloaded, 0);
    assert!(!base.join("App-1.2").exists());
    assert_eq!(fs::read(base.join("App-1.2.zip"))?, b"cached");
    assert_eq!(metrics.snapshot().runs_up_to_date_total, 1);
    Ok(())
}

#[tokio::test]
async fn pattern_without_capture_group_fails_before_download() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let server = MockServer::start_async().await;
    let page = server.mock(|when, then| {
        when.method(GET).path("/releases");
        then.status(200).body("Current version: 1.2");
    });
    let download = server.mock(|when, then| {
        when.method(GET).path("/1.2.zip");
        then.status(200).body("zip");
    });

    let mut descriptor = app_descriptor(&server);
    descriptor.explicit_version = None;
    descriptor.version_check = Some(VersionCheck {
        url: server.url("/releases"),
        pattern: r"Current version: [0-9.]+".to_string(),
        use_latest_version: false,
    });

    let (orchestrator, metrics) = orchestrator(Arc::new(NoInstaller))?;
    let err = orchestrator
        .run(&descriptor, &options(&base))
        .await
        .err()
        .ok_or_else(|| anyhow!("run should fail"))?;

    assert_eq!(err.kind(), FailureKind::PatternNotFound);
    assert_eq!(err.exit_code(), 4);
    page.assert_hits(0);
    download.assert_hits(0);
    assert_eq!(metrics.snapshot().runs_failed_total, 1);
    Ok(())
}

#[tokio::test]
async fn remote_version_with_parent_reference_is_rejected_before_io() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let victim = temp.path().join("victim");
    fs::create_dir(&victim)?;
    fs::write(victim.join("precious.txt"), "precious")?;
    let bytes = app_zip(temp.path())?;
    let server = MockServer::start_async().await;
    let page = server.mock(|when, then| {
        when.method(GET).path("/releases");
        then.status(200).body("version=../victim;");
    });
    let download = server.mock(|when, then| {
        when.method(GET).path("/victim.zip");
        then.status(200).body(bytes.clone());
    });

    let mut descriptor = zip_descriptor("{{VERSION}}", "", &server.url("/{{VERSION}}.zip"));
    descriptor.explicit_version = None;
    descriptor.version_check = Some(VersionCheck {
        url: server.url("/releases"),
        pattern: "version=([^;]+);".to_string(),
        use_latest_version: false,
    });

    let (orchestrator, metrics) = orchestrator(Arc::new(NoInstaller))?;
    let run_options = RunOptions {
        force_refresh: true,
        ..options(&base)
    };
    let err = orchestrator
        .run(&descriptor, &run_options)
        .await
        .err()
        .ok_or_else(|| anyhow!("run should fail"))?;

    page.assert();
    download.assert_hits(0);
    assert_eq!(err.kind(), FailureKind::Config);
    assert_eq!(err.exit_code(), 2);
    assert_eq!(err.operation(), "resolve_version.names");
    assert_eq!(fs::read_to_string(victim.join("precious.txt"))?, "precious");
    assert!(!victim.join("app.exe").exists());
    assert!(!temp.path().join("victim.zip").exists());
    assert_eq!(fs::read_dir(&base)?.count(), 0);
    assert_eq!(metrics.snapshot().runs_failed_total, 1);
    Ok(())
}

#[tokio::test]
async fn existing_final_folder_is_not_overwritten_without_force() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let final_folder = base.join("App-1.2");
    fs::create_dir(&final_folder)?;
    fs::write(final_folder.join("keep.txt"), "keep")?;
    let server = MockServer::start_async().await;
    let download = server.mock(|when, then| {
        when.method(GET).path("/1.2.zip");
        then.status(200).body("zip");
    });

    let (orchestrator, _) = orchestrator(Arc::new(NoInstaller))?;
    let err = orchestrator
        .run(&app_descriptor(&server), &options(&base))
        .await
        .err()
        .ok_or_else(|| anyhow!("run should fail"))?;

    assert_eq!(err.kind(), FailureKind::Filesystem);
    assert_eq!(err.operation(), "check_existing");
    download.assert_hits(0);
    assert_eq!(fs::read_to_string(final_folder.join("keep.txt"))?, "keep");
    Ok(())
}

#[tokio::test]
async fn force_refresh_replaces_final_folder_and_archive() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let final_folder = base.join("App-1.2");
    fs::create_dir(&final_folder)?;
    fs::write(final_folder.join("old.txt"), "old")?;
    fs::write(base.join("App-1.2.zip"), b"stale archive")?;
    let bytes = app_zip(temp.path())?;
    let server = MockServer::start_async().await;
    let download = server.mock(|when, then| {
        when.method(GET).path("/1.2.zip");
        then.status(200).body(bytes.clone());
    });

    let (orchestrator, _) = orchestrator(Arc::new(NoInstaller))?;
    let run_options = RunOptions {
        force_refresh: true,
        ..options(&base)
    };
    let report = orchestrator
        .run(&app_descriptor(&server), &run_options)
        .await?;

    download.assert();
    assert_eq!(report.outcome, RunOutcome::Staged);
    assert!(!final_folder.join("old.txt").exists());
    assert!(final_folder.join("bin").join("app.exe").is_file());
    assert_eq!(fs::read(base.join("App-1.2.zip"))?, bytes);
    Ok(())
}

#[tokio::test]
async fn force_with_reuse_keeps_local_archive() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let bytes = app_zip(temp.path())?;
    fs::write(base.join("App-1.2.zip"), &bytes)?;
    let server = MockServer::start_async().await;
    let download = server.mock(|when, then| {
        when.method(GET).path("/1.2.zip");
        then.status(500);
    });

    let (orchestrator, _) = orchestrator(Arc::new(NoInstaller))?;
    let run_options = RunOptions {
        force_refresh: true,
        reuse_archive: true,
        ..options(&base)
    };
    let report = orchestrator
        .run(&app_descriptor(&server), &run_options)
        .await?;

    download.assert_hits(0);
    assert!(report.archive_reused);
    assert_eq!(report.bytes_downloaded, 0);
    assert!(base.join("App-1.2").join("bin").join("app.exe").is_file());
    Ok(())
}

#[tokio::test]
async fn remote_version_with_post_processing_and_named_folder() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let archive = temp.path().join("tool.zip");
    write_zip_archive(
        &archive,
        &[
            ZipEntry::Dir("tool-3.4/"),
            ZipEntry::File("tool-3.4/tool.exe", b"tool"),
            ZipEntry::File("tool-3.4/notes.md", b"notes"),
        ],
    )?;
    let bytes = fs::read(&archive)?;
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/releases");
        then.status(200)
            .body("<li>Current version: 3.4 </li><li>Current version: 3.3</li>");
    });
    let download = server.mock(|when, then| {
        when.method(GET).path("/dl/tool-3.4.zip");
        then.status(200).body(bytes.clone());
    });

    let mut descriptor = zip_descriptor("Tool-{{VERSION}}", "", &server.url("/dl/tool-{VERSION}.zip"));
    descriptor.explicit_version = None;
    descriptor.version_check = Some(VersionCheck {
        url: server.url("/releases"),
        pattern: r"Current version:\s*([0-9.]+)".to_string(),
        use_latest_version: false,
    });
    descriptor.remove_root_folder = false;
    descriptor.explicit_folder_name = Some("Tool".to_string());
    descriptor.extract_patterns = vec![r"\.exe$".to_string(), "/$".to_string()];
    descriptor.create_folders = vec!["config".to_string()];
    descriptor
        .create_files
        .insert("config/tool.ini".to_string(), "[tool]".to_string());
    descriptor
        .move_objects
        .insert("tool-3.4/renamed.exe".to_string(), "tool-3.4/tool.exe".to_string());

    let (orchestrator, _) = orchestrator(Arc::new(NoInstaller))?;
    let report = orchestrator.run(&descriptor, &options(&base)).await?;

    download.assert();
    assert_eq!(report.version, "3.4");
    assert_eq!(report.version_source, "remote");
    assert_eq!(report.archive_path, base.join("Tool-3.4.zip"));
    let final_folder = base.join("Tool");
    assert_eq!(report.final_folder, final_folder);
    assert!(final_folder.join("tool-3.4").join("renamed.exe").is_file());
    assert!(!final_folder.join("tool-3.4").join("tool.exe").exists());
    assert!(!final_folder.join("tool-3.4").join("notes.md").exists());
    assert_eq!(
        fs::read_to_string(final_folder.join("config").join("tool.ini"))?,
        "[tool]"
    );
    assert!(!base.join("Tool-3.4_staging").exists());
    Ok(())
}

#[tokio::test]
async fn installer_package_run_relocates_selected_files() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let server = MockServer::start_async().await;
    let download = server.mock(|when, then| {
        when.method(GET).path("/app-5.0.msi");
        then.status(200).body("msi payload");
    });

    let mut descriptor = zip_descriptor("App", "5.0", &server.url("/app-{{VERSION}}.msi"));
    descriptor.archive_extension = ".msi".to_string();
    descriptor.root_folder_name = Some("SourceDir/App".to_string());
    descriptor.extract_patterns = vec![r"\.exe$".to_string(), "^lib/".to_string()];

    let (orchestrator, _) = orchestrator(Arc::new(TreeInstaller))?;
    let report = orchestrator.run(&descriptor, &options(&base)).await?;

    download.assert();
    let final_folder = base.join("App");
    assert_eq!(report.final_folder, final_folder);
    assert!(final_folder.join("app.exe").is_file());
    assert!(final_folder.join("lib").join("core.dll").is_file());
    assert!(!final_folder.join("license.rtf").exists());
    assert!(!base.join("App_staging").exists());
    assert!(!base.join("App_staging_temp").exists());
    Ok(())
}

#[tokio::test]
async fn unsupported_extension_fails_before_any_io() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let server = MockServer::start_async().await;
    let download = server.mock(|when, then| {
        when.method(GET).path("/1.2.rar");
        then.status(200).body("rar");
    });

    let mut descriptor = app_descriptor(&server);
    descriptor.archive_extension = ".rar".to_string();

    let (orchestrator, _) = orchestrator(Arc::new(NoInstaller))?;
    let err = orchestrator
        .run(&descriptor, &options(&base))
        .await
        .err()
        .ok_or_else(|| anyhow!("run should fail"))?;

    assert_eq!(err.kind(), FailureKind::UnsupportedFormat);
    assert_eq!(err.exit_code(), 11);
    download.assert_hits(0);
    assert_eq!(fs::read_dir(&base)?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn download_error_status_is_a_transport_failure() -> Result<()> {
    let temp = temp_dir()?;
    let base = base_dir(temp.path())?;
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/1.2.zip");
        then.status(404);
    });

    let (orchestrator, _) = orchestrator(Arc::new(NoInstaller))?;
    let err = orchestrator
        .run(&app_descriptor(&server), &options(&base))
        .await
        .err()
        .ok_or_else(|| anyhow!("run should fail"))?;

    assert_eq!(err.kind(), FailureKind::Transport);
    assert!(!base.join("App-1.2.zip").exists());
    Ok(())
}
