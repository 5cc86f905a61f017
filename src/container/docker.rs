use std::collections::HashMap;
use std::sync::Arc;

use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config as ContainerConfig,
    CreateContainerOptions, LogOutput, RemoveContainerOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::container::runtime::{ContainerRuntime, UnitOutput, UnitSpec, MOUNT_TARGET};
use crate::error::Result;

/// Docker-backed [`ContainerRuntime`] over bollard.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Arc<Docker>,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon and verify it is reachable.
    pub async fn connect() -> Result<Self> {
        let docker = Docker::connect_with_socket_defaults()
            .or_else(|_| Docker::connect_with_local_defaults())?;

        let version = docker.version().await?;
        info!(
            "Connected to Docker Engine version: {}",
            version.version.unwrap_or_default()
        );

        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Wrap an existing Docker client.
    pub fn new_with_docker(docker: Arc<Docker>) -> Self {
        Self { docker }
    }

    fn host_config(spec: &UnitSpec) -> HostConfig {
        HostConfig {
            // Workspace visible read-only; source and inputs are written
            // before any unit starts and no unit may mutate them.
            binds: Some(vec![format!(
                "{}:{}:ro",
                spec.workspace_dir.display(),
                MOUNT_TARGET
            )]),

            // No network access.
            network_mode: Some("none".to_string()),

            // Memory ceiling, swap pinned to the same value.
            memory: Some(spec.limits.memory_mb as i64 * 1024 * 1024),
            memory_swap: Some(spec.limits.memory_mb as i64 * 1024 * 1024),

            // CPU share via quota/period (100_000 = one full core).
            cpu_quota: Some((spec.limits.cpu_cores * 100_000.0) as i64),
            cpu_period: Some(100_000),

            pids_limit: Some(spec.limits.pids),

            // Read-only root filesystem; /tmp is the only writable surface,
            // where compiled artifacts land.
            readonly_rootfs: Some(true),
            tmpfs: Some(HashMap::from([(
                "/tmp".to_string(),
                "size=64m,nosuid,nodev".to_string(),
            )])),

            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges:true".to_string()]),
            privileged: Some(false),

            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn run_unit(&self, spec: &UnitSpec, stdin: &[u8]) -> Result<UnitOutput> {
        let container_config = ContainerConfig {
            image: Some(spec.image.clone()),
            cmd: Some(spec.argv.clone()),
            working_dir: Some(MOUNT_TARGET.to_string()),
            env: Some(vec![
                "PATH=/usr/local/bin:/usr/bin:/bin".to_string(),
                "HOME=/tmp".to_string(),
            ]),
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            open_stdin: Some(true),
            stdin_once: Some(true),
            tty: Some(false),
            network_disabled: Some(true),
            labels: Some(HashMap::from([(
                "judgebox.unit".to_string(),
                spec.name.clone(),
            )])),
            host_config: Some(Self::host_config(spec)),
            ..Default::default()
        };

        debug!("Creating execution unit {} from {}", spec.name, spec.image);

        self.docker
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name.clone(),
                    platform: None,
                }),
                container_config,
            )
            .await?;

        // Attach before start so no output frame is lost.
        let AttachContainerResults {
            mut output,
            mut input,
        } = self
            .docker
            .attach_container(
                &spec.name,
                Some(AttachContainerOptions::<String> {
                    stdin: Some(true),
                    stdout: Some(true),
                    stderr: Some(true),
                    stream: Some(true),
                    logs: Some(true),
                    ..Default::default()
                }),
            )
            .await?;

        self.docker
            .start_container(&spec.name, None::<StartContainerOptions<String>>)
            .await?;

        // Redirect the test input to the unit's stdin while draining output
        // frames. The two must run concurrently: a unit that floods stdout
        // before consuming its input would otherwise fill the transport
        // buffers and stall against the blocked stdin write. A unit that
        // exits without reading its input closes the pipe; not an error.
        let feed_stdin = async {
            if let Err(e) = input.write_all(stdin).await {
                debug!("Stdin write to {} ended early: {}", spec.name, e);
            }
            if let Err(e) = input.shutdown().await {
                debug!("Stdin shutdown for {} failed: {}", spec.name, e);
            }
            drop(input);
        };

        let drain_output = async {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();

            while let Some(frame) = output.next().await {
                match frame {
                    Ok(LogOutput::StdOut { message }) => {
                        append_capped(&mut stdout, &message, spec.max_output_bytes);
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        append_capped(&mut stderr, &message, spec.max_output_bytes);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Error reading output of unit {}: {}", spec.name, e);
                        break;
                    }
                }
            }

            (stdout, stderr)
        };

        let ((), (stdout, stderr)) = tokio::join!(feed_stdin, drain_output);

        let mut wait = self.docker.wait_container(
            &spec.name,
            Some(WaitContainerOptions {
                condition: "not-running".to_string(),
            }),
        );

        let exit_code = match wait.next().await {
            Some(Ok(response)) => response.status_code,
            // Non-zero exits surface as a dedicated wait error carrying the
            // status code.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => code,
            Some(Err(e)) => return Err(e.into()),
            None => 0,
        };

        debug!("Unit {} exited with code {}", spec.name, exit_code);

        Ok(UnitOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
        })
    }

    async fn remove_unit(&self, name: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        match self.docker.remove_container(name, Some(options)).await {
            Ok(()) => Ok(()),
            // Already gone; teardown is idempotent.
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize) {
    let remaining = cap.saturating_sub(buf.len());
    if remaining > 0 {
        buf.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ResourceLimits;
    use std::path::PathBuf;

    #[test]
    fn test_append_capped_truncates() {
        let mut buf = Vec::new();
        append_capped(&mut buf, b"hello", 3);
        assert_eq!(buf, b"hel");
        append_capped(&mut buf, b"more", 3);
        assert_eq!(buf, b"hel");
    }

    #[test]
    fn test_host_config_isolation_policy() {
        let spec = UnitSpec {
            name: "judgebox-x-0".to_string(),
            image: "python:3.9-slim".to_string(),
            argv: vec!["python".to_string(), "/code/solution.py".to_string()],
            workspace_dir: PathBuf::from("/tmp/judgebox-x"),
            limits: ResourceLimits::default(),
            max_output_bytes: 1024,
        };

        let host = DockerRuntime::host_config(&spec);
        assert_eq!(host.network_mode.as_deref(), Some("none"));
        assert_eq!(host.readonly_rootfs, Some(true));
        assert_eq!(host.memory, Some(256 * 1024 * 1024));
        assert_eq!(host.cpu_quota, Some(50_000));
        assert_eq!(host.cap_drop, Some(vec!["ALL".to_string()]));
        assert_eq!(
            host.binds,
            Some(vec!["/tmp/judgebox-x:/code:ro".to_string()])
        );
    }
}
