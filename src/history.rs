use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeRecord {
    pub episode: usize,
    pub score: u32,
    pub total_reward: f32,
    pub ticks: u64,
    // exploration rate after this episode's decay
    pub epsilon: f32,
    // loss of the episode's gradient step, if one was taken
    pub loss: Option<f32>,
    pub target_synced: bool,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    records: Vec<EpisodeRecord>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EpisodeRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EpisodeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // Mean score over the most recent `window` episodes.
    pub fn average_score(&self, window: usize) -> f32 {
        let start = self.records.len().saturating_sub(window);
        let recent = &self.records[start..];
        if recent.is_empty() {
            return 0.0;
        }
        recent.iter().map(|r| r.score as f32).sum::<f32>() / recent.len() as f32
    }

    pub fn best_score(&self) -> u32 {
        self.records.iter().map(|r| r.score).max().unwrap_or(0)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
