//! Prompt construction for crop refinement.

use crate::types::RefinementRequest;

/// Build the instruction text sent alongside the frames.
pub fn build_prompt(request: &RefinementRequest) -> String {
    let safe = &request.safe_region;
    format!(
        r#"You are given {frame_count} still frame(s) sampled from one video of {width}x{height} pixels.

Choose the crop rectangle that keeps the real content (people, action, product) and excludes
letterbox bars, captions, watermarks, logos and user-interface overlays.

HARD CONSTRAINT: the rectangle MUST lie entirely within the safe region
x={sx}, y={sy}, width={sw}, height={sh}
that is: crop_x >= {sx}, crop_y >= {sy}, crop_x + crop_w <= {sr}, crop_y + crop_h <= {sb}.

Return ONLY a single JSON object with this schema, using integer pixel values in the
coordinate system of the original {width}x{height} video:
{{
  "crop_x": 0,
  "crop_y": 0,
  "crop_w": 0,
  "crop_h": 0,
  "confidence": 0.0,
  "reason": "short explanation"
}}
"#,
        frame_count = request.frames.len(),
        width = request.source_width,
        height = request.source_height,
        sx = safe.x,
        sy = safe.y,
        sw = safe.width,
        sh = safe.height,
        sr = safe.right(),
        sb = safe.bottom(),
    )
}
