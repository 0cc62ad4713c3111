// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Key-value storage of raw (and enhanced) team updates keyed by (week_key, team_id)
// role: storage
// inputs: RawTeamUpdate / TeamUpdate values; week keys
// outputs: Stored artifacts; listings sorted by team id
// side_effects: FsStore creates <root>/<week_key>/ and writes <team>.<ext> and enhanced_<team>.<ext>
// invariants:
// - put overwrites, never appends (idempotent per key)
// - concurrent writes of one key are last-write-wins (temp file + rename); different keys never contend
// - list never returns enhanced_ artifacts or temp files
// errors: IngestionError::Storage with the offending path; IngestionError::Encoding for (de)serialization
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::IngestionError;
use crate::model::{RawTeamUpdate, TeamUpdate};

const ENHANCED_PREFIX: &str = "enhanced_";

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ArtifactFormat {
  #[default]
  Txt,
  Json,
  Yaml,
}

impl ArtifactFormat {
  pub fn extension(&self) -> &'static str {
    match self {
      ArtifactFormat::Txt => "txt",
      ArtifactFormat::Json => "json",
      ArtifactFormat::Yaml => "yaml",
    }
  }
}

/// A team id is used as a file name; reject anything that could escape the week folder.
pub fn is_safe_team_id(team_id: &str) -> bool {
  !team_id.is_empty()
    && !team_id.starts_with('.')
    && !team_id.starts_with(ENHANCED_PREFIX)
    && !team_id.contains(['/', '\\', '\0'])
}

pub trait UpdateStore: Send + Sync {
  /// Persist a raw update, replacing any previous one for the same key. Returns its location.
  fn put(&self, raw: &RawTeamUpdate) -> Result<String, IngestionError>;

  fn get(&self, week_key: &str, team_id: &str) -> Result<Option<RawTeamUpdate>, IngestionError>;

  /// All raw updates of a week, sorted by team id.
  fn list(&self, week_key: &str) -> Result<Vec<RawTeamUpdate>, IngestionError>;

  /// Persist the enhanced form of a team's update next to its raw artifact.
  fn put_enhanced(&self, week_key: &str, update: &TeamUpdate) -> Result<String, IngestionError>;
}

#[derive(Default)]
pub struct MemoryStore {
  raw: Mutex<BTreeMap<(String, String), RawTeamUpdate>>,
  enhanced: Mutex<BTreeMap<(String, String), TeamUpdate>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn enhanced(&self, week_key: &str, team_id: &str) -> Option<TeamUpdate> {
    let map = self.enhanced.lock().ok()?;
    map.get(&(week_key.to_string(), team_id.to_string())).cloned()
  }
}

fn poisoned() -> IngestionError {
  IngestionError::Encoding("store lock poisoned".into())
}

impl UpdateStore for MemoryStore {
  fn put(&self, raw: &RawTeamUpdate) -> Result<String, IngestionError> {
    let mut map = self.raw.lock().map_err(|_| poisoned())?;
    map.insert((raw.week_key.clone(), raw.team_id.clone()), raw.clone());
    Ok(format!("memory://{}/{}", raw.week_key, raw.team_id))
  }

  fn get(&self, week_key: &str, team_id: &str) -> Result<Option<RawTeamUpdate>, IngestionError> {
    let map = self.raw.lock().map_err(|_| poisoned())?;
    Ok(map.get(&(week_key.to_string(), team_id.to_string())).cloned())
  }

  fn list(&self, week_key: &str) -> Result<Vec<RawTeamUpdate>, IngestionError> {
    let map = self.raw.lock().map_err(|_| poisoned())?;
    Ok(map.iter().filter(|((w, _), _)| w == week_key).map(|(_, v)| v.clone()).collect())
  }

  fn put_enhanced(&self, week_key: &str, update: &TeamUpdate) -> Result<String, IngestionError> {
    let mut map = self.enhanced.lock().map_err(|_| poisoned())?;
    map.insert((week_key.to_string(), update.team_id.clone()), update.clone());
    Ok(format!("memory://{}/{}{}", week_key, ENHANCED_PREFIX, update.team_id))
  }
}

/// One directory per week under `root`, one file per team.
pub struct FsStore {
  root: PathBuf,
  format: ArtifactFormat,
}

impl FsStore {
  pub fn new<P: AsRef<Path>>(root: P, format: ArtifactFormat) -> Self {
    Self {
      root: root.as_ref().to_path_buf(),
      format,
    }
  }

  pub fn week_dir(&self, week_key: &str) -> PathBuf {
    self.root.join(week_key)
  }

  fn ensure_week_dir(&self, week_key: &str) -> Result<PathBuf, IngestionError> {
    let dir = self.week_dir(week_key);
    std::fs::create_dir_all(&dir).map_err(|source| IngestionError::Storage {
      path: dir.clone(),
      source,
    })?;
    Ok(dir)
  }

  fn check_team(team_id: &str) -> Result<(), IngestionError> {
    if is_safe_team_id(team_id) {
      Ok(())
    } else {
      Err(IngestionError::Encoding(format!("unsafe team id {:?}", team_id)))
    }
  }

  fn encode_raw(&self, raw: &RawTeamUpdate) -> Result<String, IngestionError> {
    match self.format {
      ArtifactFormat::Txt => Ok(raw.text.clone()),
      ArtifactFormat::Json => serde_json::to_string_pretty(raw).map_err(|e| IngestionError::Encoding(e.to_string())),
      ArtifactFormat::Yaml => serde_yaml::to_string(raw).map_err(|e| IngestionError::Encoding(e.to_string())),
    }
  }

  fn decode_raw(&self, week_key: &str, team_id: &str, content: &str) -> Result<RawTeamUpdate, IngestionError> {
    match self.format {
      ArtifactFormat::Txt => Ok(RawTeamUpdate {
        team_id: team_id.to_string(),
        week_key: week_key.to_string(),
        text: content.to_string(),
      }),
      ArtifactFormat::Json => serde_json::from_str(content).map_err(|e| IngestionError::Encoding(e.to_string())),
      ArtifactFormat::Yaml => serde_yaml::from_str(content).map_err(|e| IngestionError::Encoding(e.to_string())),
    }
  }

  fn encode_enhanced(&self, update: &TeamUpdate) -> Result<String, IngestionError> {
    match self.format {
      ArtifactFormat::Txt => Ok(update.to_text()),
      ArtifactFormat::Json => serde_json::to_string_pretty(update).map_err(|e| IngestionError::Encoding(e.to_string())),
      ArtifactFormat::Yaml => serde_yaml::to_string(update).map_err(|e| IngestionError::Encoding(e.to_string())),
    }
  }

  /// Write through a temp file in the same directory, then rename over the target.
  fn write_atomic(dir: &Path, target: &Path, content: &str) -> Result<(), IngestionError> {
    let storage = |source: std::io::Error| IngestionError::Storage {
      path: target.to_path_buf(),
      source,
    };
    let mut tmp = tempfile::Builder::new().prefix(".tmp-").tempfile_in(dir).map_err(storage)?;
    tmp.write_all(content.as_bytes()).map_err(storage)?;
    tmp.persist(target).map_err(|e| storage(e.error))?;
    Ok(())
  }
}

impl UpdateStore for FsStore {
  fn put(&self, raw: &RawTeamUpdate) -> Result<String, IngestionError> {
    Self::check_team(&raw.team_id)?;
    let dir = self.ensure_week_dir(&raw.week_key)?;
    let path = dir.join(format!("{}.{}", raw.team_id, self.format.extension()));
    let content = self.encode_raw(raw)?;
    Self::write_atomic(&dir, &path, &content)?;
    Ok(path.to_string_lossy().to_string())
  }

  fn get(&self, week_key: &str, team_id: &str) -> Result<Option<RawTeamUpdate>, IngestionError> {
    Self::check_team(team_id)?;
    let path = self.week_dir(week_key).join(format!("{}.{}", team_id, self.format.extension()));
    match std::fs::read_to_string(&path) {
      Ok(content) => self.decode_raw(week_key, team_id, &content).map(Some),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(IngestionError::Storage { path, source }),
    }
  }

  fn list(&self, week_key: &str) -> Result<Vec<RawTeamUpdate>, IngestionError> {
    let dir = self.week_dir(week_key);
    let entries = match std::fs::read_dir(&dir) {
      Ok(it) => it,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => return Err(IngestionError::Storage { path: dir, source }),
    };

    let suffix = format!(".{}", self.format.extension());
    let mut teams: Vec<String> = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|source| IngestionError::Storage {
        path: dir.clone(),
        source,
      })?;
      if !entry.path().is_file() {
        continue;
      }
      let name = entry.file_name().to_string_lossy().to_string();
      if let Some(team) = name.strip_suffix(&suffix) {
        if is_safe_team_id(team) {
          teams.push(team.to_string());
        }
      }
    }
    teams.sort();

    let mut out = Vec::with_capacity(teams.len());
    for team in teams {
      if let Some(raw) = self.get(week_key, &team)? {
        out.push(raw);
      }
    }
    Ok(out)
  }

  fn put_enhanced(&self, week_key: &str, update: &TeamUpdate) -> Result<String, IngestionError> {
    Self::check_team(&update.team_id)?;
    let dir = self.ensure_week_dir(week_key)?;
    let path = dir.join(format!("{}{}.{}", ENHANCED_PREFIX, update.team_id, self.format.extension()));
    let content = self.encode_enhanced(update)?;
    Self::write_atomic(&dir, &path, &content)?;
    Ok(path.to_string_lossy().to_string())
  }
}
