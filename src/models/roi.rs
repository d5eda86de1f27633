use serde::{Deserialize, Serialize};

/// 题目作答区域（Region of Interest）
///
/// 页面像素坐标系下的轴对齐矩形，加载后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRoi {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl QuestionRoi {
    pub fn new(id: impl Into<String>, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            w,
            h,
        }
    }

    /// 点是否落在矩形内（含边界）
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn is_valid(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }
}
