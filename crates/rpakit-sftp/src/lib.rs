//! SFTP adapter (russh + russh-sftp).
//!
//! Password-authenticated SSH, then the `sftp` subsystem on one channel.
//! Transport-level failures map to [`Error::Ssh`], file-operation failures
//! to [`Error::Sftp`], failed logins to [`Error::Auth`].

use std::sync::Arc;

use russh::client::{self, AuthResult};
use russh::keys::ssh_key::PublicKey;
use russh_sftp::client::SftpSession;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use rpakit_core::{config::SftpConfig, errors::Error, Result};

struct AcceptAllServerKeys;

impl client::Handler for AcceptAllServerKeys {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        // No host-key pinning; these wrappers talk to fixed internal hosts.
        Ok(true)
    }
}

pub struct SftpClient {
    session: client::Handle<AcceptAllServerKeys>,
    sftp: SftpSession,
}

impl SftpClient {
    /// Connect and authenticate, then open the SFTP subsystem.
    pub async fn connect(cfg: &SftpConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config::default());

        let mut session = client::connect(
            ssh_config,
            (cfg.host.as_str(), cfg.port),
            AcceptAllServerKeys,
        )
        .await
        .map_err(|e| {
            error!(host = %cfg.host, port = cfg.port, "ssh connect failed: {e}");
            Error::Ssh(format!("connect to {}:{} failed: {e}", cfg.host, cfg.port))
        })?;

        let auth = session
            .authenticate_password(&cfg.username, &cfg.password)
            .await
            .map_err(|e| {
                error!("ssh authentication errored: {e}");
                Error::Ssh(format!("authentication error: {e}"))
            })?;
        if !matches!(auth, AuthResult::Success) {
            error!(username = %cfg.username, "authentication failed");
            return Err(Error::Auth(format!(
                "password authentication failed for '{}'",
                cfg.username
            )));
        }

        let channel = session.channel_open_session().await.map_err(|e| {
            error!("ssh channel open failed: {e}");
            Error::Ssh(format!("channel open failed: {e}"))
        })?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| {
                error!("sftp subsystem request failed: {e}");
                Error::Ssh(format!("sftp subsystem request failed: {e}"))
            })?;

        let sftp = SftpSession::new(channel.into_stream()).await.map_err(|e| {
            error!("sftp session setup failed: {e}");
            Error::Sftp(format!("session setup failed: {e}"))
        })?;

        info!(host = %cfg.host, port = cfg.port, "sftp session established");
        Ok(Self { session, sftp })
    }

    /// Upload a local file to `remote_path`.
    pub async fn upload_file(&self, local_path: &str, remote_path: &str) -> Result<()> {
        let mut src = tokio::fs::File::open(local_path).await.map_err(|e| {
            error!(local_path, "local open failed: {e}");
            Error::Io(e)
        })?;

        let mut dst = self.sftp.create(remote_path).await.map_err(|e| {
            sftp_op_err("upload", local_path, remote_path, &e.to_string())
        })?;

        tokio::io::copy(&mut src, &mut dst)
            .await
            .map_err(|e| sftp_op_err("upload", local_path, remote_path, &e.to_string()))?;
        dst.shutdown()
            .await
            .map_err(|e| sftp_op_err("upload", local_path, remote_path, &e.to_string()))?;
        Ok(())
    }

    /// Upload several files; `(local, remote)` pairs.
    pub async fn upload_files(&self, file_mapping: &[(&str, &str)]) -> Result<()> {
        for (local_path, remote_path) in file_mapping {
            self.upload_file(local_path, remote_path).await?;
        }
        info!(count = file_mapping.len(), "all queued files uploaded");
        Ok(())
    }

    /// Download `remote_path` to a local file.
    pub async fn download_file(&self, remote_path: &str, local_path: &str) -> Result<()> {
        let mut src = self.sftp.open(remote_path).await.map_err(|e| {
            sftp_op_err("download", remote_path, local_path, &e.to_string())
        })?;

        let mut dst = tokio::fs::File::create(local_path).await.map_err(|e| {
            error!(local_path, "local create failed: {e}");
            Error::Io(e)
        })?;

        tokio::io::copy(&mut src, &mut dst)
            .await
            .map_err(|e| sftp_op_err("download", remote_path, local_path, &e.to_string()))?;
        dst.flush().await.map_err(Error::Io)?;
        Ok(())
    }

    /// Put a local file at another remote location (the server has no
    /// remote-to-remote copy; this re-uploads).
    pub async fn copy_file(&self, source_path: &str, destination_path: &str) -> Result<()> {
        self.upload_file(source_path, destination_path).await
    }

    pub async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.sftp
            .rename(old_path, new_path)
            .await
            .map_err(|e| sftp_op_err("rename", old_path, new_path, &e.to_string()))
    }

    /// File names in a remote directory, dotfiles filtered out.
    pub async fn list_files(&self, remote_directory: &str) -> Result<Vec<String>> {
        let entries = self.sftp.read_dir(remote_directory).await.map_err(|e| {
            error!(remote_directory, "list failed: {e}");
            Error::Sftp(format!("listing '{remote_directory}' failed: {e}"))
        })?;

        Ok(entries
            .map(|entry| entry.file_name())
            .filter(|name| is_visible(name))
            .collect())
    }

    pub async fn delete_file(&self, file_path: &str) -> Result<()> {
        self.sftp.remove_file(file_path).await.map_err(|e| {
            error!(file_path, "delete failed: {e}");
            Error::Sftp(format!("deleting '{file_path}' failed: {e}"))
        })
    }

    /// Close the SFTP channel and the SSH session. Failures here are logged
    /// and swallowed; there is nothing useful a caller can do with them.
    pub async fn disconnect(self) {
        if let Err(e) = self.sftp.close().await {
            error!("sftp close failed: {e}");
        }
        if let Err(e) = self
            .session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            error!("ssh disconnect failed: {e}");
        }
    }
}

fn sftp_op_err(action: &str, from: &str, to: &str, detail: &str) -> Error {
    error!("{action} '{from}' to '{to}' failed: {detail}");
    Error::Sftp(format!("{action} '{from}' to '{to}' failed: {detail}"))
}

fn is_visible(name: &str) -> bool {
    !name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotfiles_are_filtered_from_listings() {
        let names = ["report.csv", ".bash_history", "data.xml", ".hidden"];
        let visible: Vec<_> = names.iter().filter(|n| is_visible(n)).collect();
        assert_eq!(visible, [&"report.csv", &"data.xml"]);
    }
}
