//! 作答归属 - 业务能力层
//!
//! 把 OCR 文字片段按包围盒中心点分配到题目作答区域，
//! 再按阅读顺序拼接成每道题的作答文本

use crate::models::{AttributedAnswers, OcrSpan, QuestionRoi};
use std::cmp::Ordering;
use tracing::debug;

/// 片段归属到第一个包含其中心点的 ROI（按配置顺序）
///
/// 不属于任何 ROI 的片段被丢弃
pub fn assign_spans<'a>(spans: &'a [OcrSpan], rois: &[QuestionRoi]) -> Vec<Vec<&'a OcrSpan>> {
    let mut groups: Vec<Vec<&OcrSpan>> = vec![Vec::new(); rois.len()];

    for span in spans {
        let (cx, cy) = span.center();
        match rois.iter().position(|roi| roi.contains(cx, cy)) {
            Some(index) => groups[index].push(span),
            None => debug!(
                "片段 '{}' 中心 ({:.1}, {:.1}) 不在任何作答区域内，丢弃",
                span.content, cx, cy
            ),
        }
    }

    groups
}

/// 按 (y_min, x_min) 升序拼接，先上后下、同一行从左到右
pub fn join_in_reading_order(mut spans: Vec<&OcrSpan>) -> String {
    spans.sort_by(|a, b| {
        a.y_min()
            .partial_cmp(&b.y_min())
            .unwrap_or(Ordering::Equal)
            .then(a.x_min().partial_cmp(&b.x_min()).unwrap_or(Ordering::Equal))
    });

    spans
        .iter()
        .map(|span| span.content.trim())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 还原每道题的作答文本
///
/// 每个 ROI 都会出现在结果中，没有片段的题目为空字符串
pub fn attribute(spans: &[OcrSpan], rois: &[QuestionRoi]) -> AttributedAnswers {
    let groups = assign_spans(spans, rois);

    let mut answers = AttributedAnswers::new();
    for (roi, group) in rois.iter().zip(groups) {
        answers
            .entry(roi.id.clone())
            .or_insert_with(|| join_in_reading_order(group));
    }
    answers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(content: &str, bbox: [f64; 4]) -> OcrSpan {
        OcrSpan::new(content, bbox)
    }

    #[test]
    fn test_single_span_in_roi() {
        let rois = vec![QuestionRoi::new("q1", 0.0, 0.0, 100.0, 50.0)];
        let spans = vec![span("B", [10.0, 10.0, 30.0, 30.0])];

        let answers = attribute(&spans, &rois);
        assert_eq!(answers.get("q1").map(String::as_str), Some("B"));
    }

    #[test]
    fn test_span_between_rois_is_discarded() {
        let rois = vec![
            QuestionRoi::new("q1", 0.0, 0.0, 100.0, 50.0),
            QuestionRoi::new("q2", 0.0, 100.0, 100.0, 50.0),
        ];
        let spans = vec![
            span("A", [10.0, 10.0, 30.0, 30.0]),
            // 中心 (50, 75)，位于两个区域之间
            span("stray", [40.0, 70.0, 60.0, 80.0]),
            span("C", [10.0, 110.0, 30.0, 130.0]),
        ];

        let answers = attribute(&spans, &rois);
        assert_eq!(answers["q1"], "A");
        assert_eq!(answers["q2"], "C");
        assert!(answers.values().all(|a| !a.contains("stray")));
    }

    #[test]
    fn test_overlap_goes_to_first_roi() {
        let rois = vec![
            QuestionRoi::new("q1", 0.0, 0.0, 100.0, 100.0),
            QuestionRoi::new("q2", 50.0, 50.0, 100.0, 100.0),
        ];
        let spans = vec![span("X", [60.0, 60.0, 80.0, 80.0])];

        let answers = attribute(&spans, &rois);
        assert_eq!(answers["q1"], "X");
        assert_eq!(answers["q2"], "");
    }

    #[test]
    fn test_reading_order_top_to_bottom_left_to_right() {
        let rois = vec![QuestionRoi::new("q1", 0.0, 0.0, 400.0, 200.0)];
        let spans = vec![
            span("world", [120.0, 10.0, 200.0, 30.0]),
            span("line", [10.0, 60.0, 60.0, 80.0]),
            span("hello", [10.0, 10.0, 100.0, 30.0]),
            span("two", [70.0, 60.0, 120.0, 80.0]),
        ];

        let answers = attribute(&spans, &rois);
        assert_eq!(answers["q1"], "hello world line two");
    }

    #[test]
    fn test_unanswered_question_is_empty() {
        let rois = vec![
            QuestionRoi::new("q1", 0.0, 0.0, 100.0, 50.0),
            QuestionRoi::new("q2", 0.0, 60.0, 100.0, 50.0),
        ];
        let spans = vec![span("B", [10.0, 10.0, 30.0, 30.0]), span("  ", [10.0, 70.0, 30.0, 90.0])];

        let answers = attribute(&spans, &rois);
        assert_eq!(answers.len(), 2);
        assert_eq!(answers["q2"], "");
    }

    #[test]
    fn test_attribution_is_deterministic() {
        let rois = vec![
            QuestionRoi::new("q1", 0.0, 0.0, 100.0, 50.0),
            QuestionRoi::new("q2", 0.0, 60.0, 300.0, 100.0),
        ];
        let spans = vec![
            span("b", [120.0, 70.0, 150.0, 90.0]),
            span("A", [10.0, 10.0, 30.0, 30.0]),
            span("a", [10.0, 70.0, 30.0, 90.0]),
        ];

        let first = attribute(&spans, &rois);
        let second = attribute(&spans, &rois);
        assert_eq!(first, second);
        assert_eq!(first["q2"], "a b");
    }
}
