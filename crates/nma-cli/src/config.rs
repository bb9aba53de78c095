//! Analysis configuration (YAML or JSON).

use anyhow::{Context, Result, bail};
use nma_core::EffectMeasure;
use nma_inference::{NetworkMetaAnalysis, mean_difference_nma, odds_ratio_nma};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// `odds_ratio` (binomial arms) or `mean_difference` (continuous arms).
    pub measure: EffectMeasure,

    /// Add the DerSimonian-Laird τ² to every contrast variance.
    #[serde(default)]
    pub random_effects: bool,

    /// Confidence-interval width for every reported interval.
    #[serde(default = "default_width")]
    pub width: f64,

    /// Rank smaller effects as better (e.g. adverse-event odds ratios).
    #[serde(default)]
    pub smaller_better: bool,

    /// Treatment for study-level effects and the comparison-adjusted funnel.
    #[serde(default)]
    pub reference: Option<Label>,

    pub arms: Vec<ArmRecord>,
}

fn default_width() -> f64 {
    0.95
}

/// One study arm. Binomial arms set `positive`/`total`, continuous arms set
/// `mean`/`sd`/`n`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArmRecord {
    pub study: Label,
    pub treatment: Label,
    #[serde(default)]
    pub positive: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub sd: Option<f64>,
    #[serde(default)]
    pub n: Option<u64>,
}

/// Study or treatment identifier; configs may use numbers or strings.
///
/// `1` and `"1"` are different labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{v}"),
            Label::Text(s) => f.write_str(s),
        }
    }
}

pub fn read_analysis_config(path: &Path) -> Result<AnalysisConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: AnalysisConfig = if ext == "json" {
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?
    } else {
        // Default: YAML (serde_yaml_ng).
        serde_yaml_ng::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?
    };
    Ok(cfg)
}

impl AnalysisConfig {
    pub fn studies(&self) -> Vec<Label> {
        self.arms.iter().map(|a| a.study.clone()).collect()
    }

    pub fn treatments(&self) -> Vec<Label> {
        self.arms.iter().map(|a| a.treatment.clone()).collect()
    }

    /// Run the analysis described by the config.
    pub fn analyze(&self) -> Result<NetworkMetaAnalysis<Label, Label>> {
        let studies = self.studies();
        let treatments = self.treatments();
        let nma = match self.measure {
            EffectMeasure::OddsRatio => {
                let mut positives = Vec::with_capacity(self.arms.len());
                let mut totals = Vec::with_capacity(self.arms.len());
                for (i, arm) in self.arms.iter().enumerate() {
                    match (arm.positive, arm.total) {
                        (Some(p), Some(t)) => {
                            positives.push(p);
                            totals.push(t);
                        }
                        _ => bail!("arm {i} (study {}): odds_ratio needs `positive` and `total`", arm.study),
                    }
                }
                odds_ratio_nma(&studies, &treatments, &positives, &totals, self.random_effects)?
            }
            EffectMeasure::MeanDifference => {
                let mut means = Vec::with_capacity(self.arms.len());
                let mut sds = Vec::with_capacity(self.arms.len());
                let mut sizes = Vec::with_capacity(self.arms.len());
                for (i, arm) in self.arms.iter().enumerate() {
                    match (arm.mean, arm.sd, arm.n) {
                        (Some(m), Some(s), Some(n)) => {
                            means.push(m);
                            sds.push(s);
                            sizes.push(n);
                        }
                        _ => bail!("arm {i} (study {}): mean_difference needs `mean`, `sd` and `n`", arm.study),
                    }
                }
                mean_difference_nma(&studies, &treatments, &means, &sds, &sizes, self.random_effects)?
            }
        };
        Ok(nma)
    }
}
