use crate::commands::{build_flow, load_config, print_notifications};
use clap::Args;
use common::error::StudioError;
use common::types::FileEntry;
use orchestrator::UploadOutcome;
use std::path::PathBuf;
use tokio::runtime::Runtime;

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Dataset files to stage and send as one batch
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Where to write the archive; defaults to the server's filename
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn handle_upload(args: UploadArgs, config_path: Option<PathBuf>) -> Result<(), StudioError> {
    let config = load_config(config_path)?;

    let mut entries = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let meta = std::fs::metadata(path).map_err(StudioError::startup)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StudioError::startup_msg(format!("'{}' has no usable file name", path.display()))
            })?
            .to_owned();
        entries.push(FileEntry::from_path(name, meta.len(), path.clone()));
    }

    let rt = Runtime::new().map_err(StudioError::startup)?;
    rt.block_on(async {
        let flow = build_flow(&config)?;
        let orch = flow.orchestrator();
        orch.add_files(entries);

        let outcome = orch.submit_batch().await.map_err(StudioError::workflow)?;
        print_notifications(&flow);
        if let UploadOutcome::Uploaded(receipt) = outcome {
            log::info!("server acknowledged {} file(s)", receipt.uploaded);
        }
        Ok(())
    })
}

pub fn handle_download(args: DownloadArgs, config_path: Option<PathBuf>) -> Result<(), StudioError> {
    let config = load_config(config_path)?;
    let rt = Runtime::new().map_err(StudioError::startup)?;
    rt.block_on(async {
        let flow = build_flow(&config)?;
        let artifact = flow
            .orchestrator()
            .download_agent()
            .await
            .map_err(StudioError::request)?;
        print_notifications(&flow);

        let target = args.out.unwrap_or_else(|| PathBuf::from(&artifact.filename));
        std::fs::write(&target, &artifact.bytes).map_err(StudioError::startup)?;
        println!("wrote {} ({} bytes)", target.display(), artifact.bytes.len());
        Ok(())
    })
}
