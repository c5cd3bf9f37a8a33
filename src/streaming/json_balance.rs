/// Whether an accumulated fragment is balanced enough to be worth parsing as JSON.
///
/// Scans left to right counting `{`/`}` and `[`/`]` separately. Returns `false` as
/// soon as either count goes negative, and `true` only if both end at zero.
/// Brackets inside string literals are not counted. A `true` result does not
/// mean the text is valid JSON; it only means a parse attempt is not obviously
/// premature.
pub fn is_balanced(text: &str) -> bool {
    let mut braces: i64 = 0;
    let mut brackets: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            if escaped {
                escaped = false;
            } else {
                match byte {
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => braces += 1,
            b'}' => braces -= 1,
            b'[' => brackets += 1,
            b']' => brackets -= 1,
            _ => {}
        }

        if braces < 0 || brackets < 0 {
            return false;
        }
    }

    braces == 0 && brackets == 0
}
