use serde::Serialize;

/// 帧分组组件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameGroupingComponent {
    pub in_app: bool,
    pub contributes: bool,
    pub hint: Option<String>,
}

impl FrameGroupingComponent {
    pub fn new(in_app: bool, contributes: bool) -> Self {
        Self {
            in_app,
            contributes,
            hint: None,
        }
    }

    /// 只覆盖传入的值（None 表示保持原值）
    pub fn update(&mut self, contributes: Option<bool>, hint: Option<String>) {
        if let Some(contributes) = contributes {
            self.contributes = contributes;
        }
        if hint.is_some() {
            self.hint = hint;
        }
    }
}

/// 帧分类统计（应用内/系统 × 贡献/不贡献）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameCounts {
    pub in_app_contributing_frames: usize,
    pub in_app_non_contributing_frames: usize,
    pub system_contributing_frames: usize,
    pub system_non_contributing_frames: usize,
}

impl FrameCounts {
    pub fn tally(&mut self, component: &FrameGroupingComponent) {
        let slot = match (component.in_app, component.contributes) {
            (true, true) => &mut self.in_app_contributing_frames,
            (true, false) => &mut self.in_app_non_contributing_frames,
            (false, true) => &mut self.system_contributing_frames,
            (false, false) => &mut self.system_non_contributing_frames,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.in_app_contributing_frames
            + self.in_app_non_contributing_frames
            + self.system_contributing_frames
            + self.system_non_contributing_frames
    }
}

/// 堆栈分组组件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StacktraceGroupingComponent {
    pub values: Vec<FrameGroupingComponent>,
    pub contributes: bool,
    pub hint: Option<String>,
    pub frame_counts: FrameCounts,
    pub invert_stacktrace: bool,
}
