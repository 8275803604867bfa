use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{RcDom, SerializableHandle};

/// 序列化文档
///
/// 标注过的DOM序列化回字节流；文档声明了非UTF-8编码时按原编码重新编码，
/// 使输出与输入的字符集一致。
pub fn serialize_document(dom: RcDom, document_encoding: String) -> Vec<u8> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = dom.document.into();
    serialize(&mut buf, &serializable, SerializeOpts::default())
        .expect("Unable to serialize DOM into buffer");

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let s: &str = &String::from_utf8_lossy(&buf);
            let (data, _, _) = encoding.encode(s);
            buf = data.to_vec();
        }
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn test_serialize_round_trip() {
        let html = "<html><head></head><body><p>Deposit 1,000 won</p></body></html>";
        let dom = html_to_dom(html.as_bytes(), "utf-8".to_string());
        let output = String::from_utf8(serialize_document(dom, "utf-8".to_string())).unwrap();

        assert!(output.contains("<p>Deposit 1,000 won</p>"));
    }
}
