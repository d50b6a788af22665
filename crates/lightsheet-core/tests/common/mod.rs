use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lightsheet_core::engine::{Backend, Invocation};
use lightsheet_core::error::{PipelineError, Result};
use lightsheet_core::paths::{plan_artifacts, ArtifactSet};
use lightsheet_core::pipeline::config::PipelineConfig;
use lightsheet_core::pipeline::{FusionConfirmation, Stage};
use lightsheet_core::report::{Notification, Notifier};
use lightsheet_core::resources::ResourceEstimate;
use tempfile::TempDir;

pub const GB: u64 = 1024 * 1024 * 1024;

/// Build a project description with the given view counts.
pub fn project_xml(channels: u32, illuminations: u32, timepoints: u32) -> String {
    let mut xml = String::from("<SpimData version=\"0.2\"><SequenceDescription>");
    xml.push_str("<ViewSetups>");
    xml.push_str("<Attributes name=\"illumination\">");
    for i in 0..illuminations {
        xml.push_str(&format!("<Illumination><id>{i}</id><name>{i}</name></Illumination>"));
    }
    xml.push_str("</Attributes><Attributes name=\"channel\">");
    for c in 0..channels {
        xml.push_str(&format!("<Channel><id>{c}</id><name>{c}</name></Channel>"));
    }
    xml.push_str("</Attributes><Attributes name=\"tile\"><Tile><id>0</id></Tile></Attributes>");
    xml.push_str("</ViewSetups>");
    xml.push_str(&format!(
        "<Timepoints type=\"range\"><first>0</first><last>{}</last></Timepoints>",
        timepoints.saturating_sub(1)
    ));
    xml.push_str("</SequenceDescription></SpimData>");
    xml
}

/// A directory holding one acquisition file of a given size.
pub struct Dataset {
    pub dir: TempDir,
    pub input: PathBuf,
}

impl Dataset {
    pub fn new(file_name: &str, size: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join(file_name);
        let file = std::fs::File::create(&input).unwrap();
        file.set_len(size).unwrap();
        Self { dir, input }
    }

    pub fn artifacts(&self, config: &PipelineConfig) -> ArtifactSet {
        plan_artifacts(&self.input, config).unwrap()
    }
}

/// Files the fake engine writes when a stage runs.
#[derive(Clone, Default)]
pub struct FakeOutputs {
    /// Project description written by the define stage.
    pub project: Option<(PathBuf, String)>,
    /// Container written by the resave stage, with its size.
    pub container: Option<(PathBuf, u64)>,
    /// Directory the fuse stage replaces with a plain file, so it can no
    /// longer be removed as a directory.
    pub clobber_on_fuse: Option<PathBuf>,
}

/// Records every invocation and simulates the engine's side effects.
#[derive(Default)]
pub struct RecordingBackend {
    pub calls: Mutex<Vec<(Stage, Invocation)>>,
    pub reclaims: Mutex<u32>,
    outputs: FakeOutputs,
    fail_at: Option<Stage>,
}

impl RecordingBackend {
    pub fn new(outputs: FakeOutputs) -> Self {
        Self {
            outputs,
            ..Default::default()
        }
    }

    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.calls.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    pub fn invocation(&self, stage: Stage) -> Option<Invocation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, i)| i.clone())
    }
}

fn write_sized(path: &Path, size: u64) {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    file.set_len(size).unwrap();
}

impl Backend for RecordingBackend {
    fn invoke(&self, stage: Stage, invocation: &Invocation) -> Result<()> {
        self.calls.lock().unwrap().push((stage, invocation.clone()));
        if self.fail_at == Some(stage) {
            return Err(PipelineError::Backend(format!("simulated failure in {stage}")));
        }
        match stage {
            Stage::DefineDataset => {
                if let Some((path, xml)) = &self.outputs.project {
                    std::fs::write(path, xml).unwrap();
                }
            }
            Stage::Resave => {
                if let Some((path, size)) = &self.outputs.container {
                    write_sized(path, *size);
                }
            }
            Stage::Fuse => {
                if let Some(dir) = &self.outputs.clobber_on_fuse {
                    std::fs::remove_dir_all(dir).unwrap();
                    std::fs::write(dir, b"in the way").unwrap();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn can_reclaim_memory(&self) -> bool {
        true
    }

    fn reclaim_memory(&self) -> Result<()> {
        *self.reclaims.lock().unwrap() += 1;
        Ok(())
    }
}

/// Keeps sent messages instead of delivering them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A relay that is always down.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&self, _message: &Notification) -> Result<()> {
        Err(PipelineError::Notification("connection refused".into()))
    }
}

/// Fixed answer to the slow-fusion question, counting how often it was asked.
pub struct FixedAnswer {
    pub answer: bool,
    pub asked: Mutex<u32>,
}

impl FixedAnswer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(0),
        }
    }

    pub fn times_asked(&self) -> u32 {
        *self.asked.lock().unwrap()
    }
}

impl FusionConfirmation for FixedAnswer {
    fn confirm_slow_fusion(&self, _estimate: &ResourceEstimate) -> bool {
        *self.asked.lock().unwrap() += 1;
        self.answer
    }
}

/// Config with no waits and no host probing.
pub fn quiet_config(free_memory: u64) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.reclaim.pause_secs = 0;
    config.resources.free_memory_override = Some(free_memory);
    config.converter.search_prefixes = Vec::new();
    config
}
