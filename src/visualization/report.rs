use crate::pipeline::{AnalysisResult, Landmark};
use crate::visualization::hint::render_hint;

pub fn print_result(result: &AnalysisResult) {
    let hint = render_hint(result);
    println!("=== Alignment Result ===");
    println!("  Verdict: {}", result.alignment);
    println!("  Confidence: {:.2}", result.confidence);
    println!("  Tip: {}", result.tip);
    println!(
        "  Offset: (dx {:+.3}, dy {:+.3})",
        result.raw_offset.dx, result.raw_offset.dy
    );
    println!("  Hint: {}", hint.text);
}

pub fn print_landmark(label: &str, landmark: Option<&Landmark>) {
    match landmark {
        Some(l) => println!("{}: {} at ({:.3}, {:.3})", label, l.name, l.x, l.y),
        None => println!("{}: no landmark found", label),
    }
}
