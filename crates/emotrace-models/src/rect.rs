use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A face bounding box in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaceBox {
    /// X coordinate of the top-left corner in pixels
    pub x: i32,
    /// Y coordinate of the top-left corner in pixels
    pub y: i32,
    /// Width of the box in pixels
    pub width: i32,
    /// Height of the box in pixels
    pub height: i32,
}

impl FaceBox {
    /// Create a new face box.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Area of the box in pixels.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Clamp the box to a frame of the given dimensions.
    ///
    /// Returns `None` when nothing of the box remains inside the frame.
    pub fn clamped_to(&self, frame_width: i32, frame_height: i32) -> Option<Self> {
        let x = self.x.max(0);
        let y = self.y.max(0);
        let width = (self.x + self.width).min(frame_width) - x;
        let height = (self.y + self.height).min(frame_height) - y;
        let clamped = Self {
            x,
            y,
            width,
            height,
        };
        clamped.is_valid().then_some(clamped)
    }
}
