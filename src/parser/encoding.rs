use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// 检测字节流编码并解码；无法解码的字节直接丢弃。
///
/// 只要出现解码错误，文本中所有 U+FFFD 都会被删除，
/// 包括源文件里原本就写着的 U+FFFD 字符。
pub fn decode_lossy(bytes: &[u8]) -> (String, &'static Encoding) {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed = detector.guess(None, true);

    // decode 会优先识别 BOM
    let (text, actual, had_errors) = guessed.decode(bytes);
    let text = if had_errors {
        text.replace('\u{FFFD}', "")
    } else {
        text.into_owned()
    };
    (text, actual)
}
