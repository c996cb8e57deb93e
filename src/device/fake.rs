//! Scripted in-memory device for tests
//!
//! Records every call so tests can assert whether playback was restarted,
//! left alone, or stopped. `load` immediately reports a known duration, so
//! resume-seek paths complete without polling delays.

use crate::device::AudioDevice;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct FakeState {
    loaded: Option<PathBuf>,
    paused: bool,
    volume: f64,
    time_pos: Option<f64>,
    duration: Option<f64>,
    loads: Vec<PathBuf>,
    stops: usize,
    seeks: Vec<f64>,
    fail_next: bool,
}

/// In-memory [`AudioDevice`] with full call recording
#[derive(Debug, Default)]
pub struct FakeDevice {
    state: Mutex<FakeState>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths passed to `load`, in order
    pub fn loads(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().loads.clone()
    }

    /// Number of `stop` calls seen
    pub fn stop_count(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    /// Positions passed to `seek`, in order
    pub fn seeks(&self) -> Vec<f64> {
        self.state.lock().unwrap().seeks.clone()
    }

    /// Currently loaded path, if any
    pub fn loaded(&self) -> Option<PathBuf> {
        self.state.lock().unwrap().loaded.clone()
    }

    /// Force a playback position, e.g. to exercise the seek-to-zero branch
    pub fn set_time_pos(&self, pos: Option<f64>) {
        self.state.lock().unwrap().time_pos = pos;
    }

    /// Simulate the loaded track finishing (device goes idle)
    pub fn finish_track(&self) {
        let mut s = self.state.lock().unwrap();
        s.loaded = None;
        s.time_pos = None;
        s.duration = None;
    }

    /// Make the next device call fail
    pub fn fail_next(&self) {
        self.state.lock().unwrap().fail_next = true;
    }

    fn check_fail(&self) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        if s.fail_next {
            s.fail_next = false;
            return Err(Error::Device("scripted failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AudioDevice for FakeDevice {
    async fn load(&self, path: &Path) -> Result<()> {
        self.check_fail()?;
        let mut s = self.state.lock().unwrap();
        s.loaded = Some(path.to_path_buf());
        s.loads.push(path.to_path_buf());
        s.paused = false;
        s.time_pos = Some(0.0);
        s.duration = Some(180.0);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.check_fail()?;
        let mut s = self.state.lock().unwrap();
        s.loaded = None;
        s.time_pos = None;
        s.duration = None;
        s.stops += 1;
        Ok(())
    }

    async fn set_pause(&self, paused: bool) -> Result<()> {
        self.check_fail()?;
        self.state.lock().unwrap().paused = paused;
        Ok(())
    }

    async fn seek(&self, secs: f64) -> Result<()> {
        self.check_fail()?;
        let mut s = self.state.lock().unwrap();
        s.seeks.push(secs);
        s.time_pos = Some(secs);
        Ok(())
    }

    async fn volume(&self) -> Result<f64> {
        Ok(self.state.lock().unwrap().volume)
    }

    async fn set_volume(&self, volume: f64) -> Result<()> {
        self.check_fail()?;
        self.state.lock().unwrap().volume = volume;
        Ok(())
    }

    async fn time_pos(&self) -> Result<Option<f64>> {
        Ok(self.state.lock().unwrap().time_pos)
    }

    async fn duration(&self) -> Result<Option<f64>> {
        Ok(self.state.lock().unwrap().duration)
    }

    async fn idle_active(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().loaded.is_none())
    }

    async fn paused(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().paused)
    }

    async fn quit(&self) -> Result<()> {
        Ok(())
    }
}
