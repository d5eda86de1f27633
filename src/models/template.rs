use crate::error::ConfigError;
use crate::models::question::QuestionDefinition;
use crate::models::roi::QuestionRoi;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 试卷模板：一份作业的作答区域和题目定义
///
/// `rois` 的顺序即重叠区域的优先级
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperTemplate {
    pub assignment_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rois: Vec<QuestionRoi>,
    #[serde(default)]
    pub questions: Vec<QuestionDefinition>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl PaperTemplate {
    pub fn new(
        assignment_id: impl Into<String>,
        rois: Vec<QuestionRoi>,
        questions: Vec<QuestionDefinition>,
    ) -> Self {
        Self {
            assignment_id: assignment_id.into(),
            name: String::new(),
            rois,
            questions,
            file_path: None,
        }
    }

    pub fn question(&self, id: &str) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// 满分
    pub fn max_total(&self) -> f64 {
        self.questions.iter().map(|q| q.max_points).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for roi in &self.rois {
            if !roi.is_valid() {
                return Err(ConfigError::InvalidRoi {
                    id: roi.id.clone(),
                    w: roi.w,
                    h: roi.h,
                });
            }
            if !seen.insert(roi.id.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "ROI",
                    id: roi.id.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !question.max_points.is_finite() || question.max_points < 0.0 {
                return Err(ConfigError::InvalidMaxPoints {
                    id: question.id.clone(),
                    max_points: question.max_points,
                });
            }
            if !seen.insert(question.id.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "题目",
                    id: question.id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;

    fn template() -> PaperTemplate {
        PaperTemplate::new(
            "a1",
            vec![QuestionRoi::new("q1", 0.0, 0.0, 100.0, 50.0)],
            vec![QuestionDefinition::new("q1", QuestionType::SingleChoice, "B", 5.0)],
        )
    }

    #[test]
    fn test_valid_template() {
        let t = template();
        assert!(t.validate().is_ok());
        assert_eq!(t.max_total(), 5.0);
        assert!(t.question("q1").is_some());
        assert!(t.question("q2").is_none());
    }

    #[test]
    fn test_rejects_zero_width_roi() {
        let mut t = template();
        t.rois.push(QuestionRoi::new("q2", 0.0, 60.0, 0.0, 10.0));
        assert!(matches!(t.validate(), Err(ConfigError::InvalidRoi { .. })));
    }

    #[test]
    fn test_rejects_negative_points_and_duplicates() {
        let mut t = template();
        t.questions[0].max_points = -1.0;
        assert!(matches!(t.validate(), Err(ConfigError::InvalidMaxPoints { .. })));

        let mut t = template();
        t.rois.push(QuestionRoi::new("q1", 0.0, 60.0, 10.0, 10.0));
        assert!(matches!(t.validate(), Err(ConfigError::DuplicateId { .. })));
    }

    #[test]
    fn test_rejects_infinite_points() {
        let mut t = template();
        t.questions[0].max_points = f64::INFINITY;
        assert!(matches!(t.validate(), Err(ConfigError::InvalidMaxPoints { .. })));

        let mut t = template();
        t.questions[0].max_points = f64::NAN;
        assert!(matches!(t.validate(), Err(ConfigError::InvalidMaxPoints { .. })));
    }
}
