//! 悬浮层注入模块
//!
//! 向已标注的文档注入提示气泡的样式和交互脚本。脚本在浏览器里
//! 实现悬停驻留（700毫秒展示）、宽限期（300毫秒隐藏）、气泡内
//! 查词按钮以及结果弹窗，查询走文本释义接口。注入是幂等的：
//! 样式和脚本节点带固定id，已存在时跳过。

use markup5ever_rcdom::{Handle, RcDom};

use crate::annotate::config::AnnotateConfig;
use crate::annotate::error::{AnnotateError, AnnotateResult};
use crate::parsers::html::dom::{
    create_element_node, create_text_node, find_nodes, get_node_attr,
};

const OVERLAY_STYLE_ID: &str = "finmark-overlay-style";
const OVERLAY_SCRIPT_ID: &str = "finmark-overlay-script";

const OVERLAY_CSS: &str = r#"
mark.fin-term {
    background: transparent;
    color: inherit;
    border-bottom: 2px dotted #2a7de1;
    cursor: help;
}
#finmark-tooltip-bubble {
    position: absolute;
    z-index: 2147483646;
    max-width: 320px;
    padding: 8px 10px;
    border-radius: 6px;
    background: #1f2733;
    color: #f5f7fa;
    font-size: 13px;
    line-height: 1.5;
    box-shadow: 0 4px 14px rgba(0, 0, 0, 0.35);
}
#finmark-tooltip-bubble[hidden] {
    display: none;
}
#finmark-tooltip-bubble .finmark-lookup {
    margin-top: 6px;
    padding: 3px 10px;
    border: none;
    border-radius: 4px;
    background: #2a7de1;
    color: #fff;
    font-size: 12px;
    cursor: pointer;
}
#finmark-tooltip-bubble .finmark-lookup[disabled] {
    opacity: 0.6;
    cursor: wait;
}
#finmark-tooltip-result-modal {
    position: fixed;
    z-index: 2147483647;
    top: 50%;
    left: 50%;
    transform: translate(-50%, -50%);
    width: min(420px, 90vw);
    padding: 16px 18px;
    border-radius: 8px;
    background: #fff;
    color: #1f2733;
    box-shadow: 0 8px 30px rgba(0, 0, 0, 0.3);
}
#finmark-tooltip-result-modal[hidden] {
    display: none;
}
"#;

// 占位符 __FINMARK_API__ / __FINMARK_DWELL__ / __FINMARK_HIDE__
// 在注入时被替换，避免 format! 的花括号转义。
const OVERLAY_JS: &str = r#"
(function () {
    'use strict';
    if (window.__finmarkOverlay) { return; }
    window.__finmarkOverlay = true;

    var API_BASE = '__FINMARK_API__';
    var DWELL_MS = __FINMARK_DWELL__;
    var HIDE_MS = __FINMARK_HIDE__;

    var bubble = document.createElement('div');
    bubble.id = 'finmark-tooltip-bubble';
    bubble.hidden = true;
    document.body.appendChild(bubble);

    var modal = document.createElement('div');
    modal.id = 'finmark-tooltip-result-modal';
    modal.hidden = true;
    document.body.appendChild(modal);

    var dwellTimer = null;
    var hideTimer = null;
    var activeTerm = null;

    function cancelTimers() {
        if (dwellTimer) { clearTimeout(dwellTimer); dwellTimer = null; }
        if (hideTimer) { clearTimeout(hideTimer); hideTimer = null; }
    }

    function showBubble(mark) {
        activeTerm = mark.textContent;
        bubble.innerHTML = '';
        var label = document.createElement('div');
        label.textContent = activeTerm;
        bubble.appendChild(label);
        var lookup = document.createElement('button');
        lookup.className = 'finmark-lookup';
        lookup.type = 'button';
        lookup.textContent = 'Look up';
        lookup.addEventListener('click', function () { lookupTerm(lookup, activeTerm); });
        bubble.appendChild(lookup);

        var rect = mark.getBoundingClientRect();
        bubble.hidden = false;
        bubble.style.left = (window.scrollX + rect.left) + 'px';
        bubble.style.top = (window.scrollY + rect.top - bubble.offsetHeight - 6) + 'px';
    }

    function hideBubble() {
        bubble.hidden = true;
        activeTerm = null;
    }

    function scheduleHide() {
        cancelTimers();
        hideTimer = setTimeout(hideBubble, HIDE_MS);
    }

    function lookupTerm(button, term) {
        button.disabled = true;
        button.textContent = 'Looking up...';
        fetch(API_BASE + '/define_term_text', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ term: term })
        }).then(function (resp) {
            if (!resp.ok) { throw new Error('HTTP ' + resp.status); }
            return resp.json();
        }).then(function (data) {
            showResult(data);
        }).catch(function (err) {
            alert('Definition lookup failed: ' + err.message);
        }).then(function () {
            button.disabled = false;
            button.textContent = 'Look up';
        });
    }

    function showResult(data) {
        modal.innerHTML = '';
        var title = document.createElement('h3');
        title.textContent = data.term || activeTerm || '';
        modal.appendChild(title);
        var body = document.createElement('p');
        body.textContent = data.definition || '';
        modal.appendChild(body);
        if (data.category) {
            var cat = document.createElement('p');
            cat.textContent = data.category;
            modal.appendChild(cat);
        }
        var close = document.createElement('button');
        close.type = 'button';
        close.textContent = 'Close';
        close.addEventListener('click', function () { modal.hidden = true; });
        modal.appendChild(close);
        modal.hidden = false;
    }

    document.addEventListener('mouseover', function (event) {
        var mark = event.target.closest && event.target.closest('mark.fin-term');
        if (mark) {
            cancelTimers();
            dwellTimer = setTimeout(function () { showBubble(mark); }, DWELL_MS);
        } else if (bubble.contains(event.target)) {
            cancelTimers();
        }
    });

    document.addEventListener('mouseout', function (event) {
        var mark = event.target.closest && event.target.closest('mark.fin-term');
        if (mark || bubble.contains(event.target)) {
            scheduleHide();
        } else if (dwellTimer) {
            clearTimeout(dwellTimer);
            dwellTimer = null;
        }
    });
})();
"#;

/// 向文档注入悬浮层样式与脚本
///
/// 样式插入 head，脚本插入 body 末尾；对应id的节点已存在时
/// 原样保留。文档缺少 head 或 body 时报渲染错误。
pub fn inject_overlay(dom: &RcDom, config: &AnnotateConfig) -> AnnotateResult<()> {
    let head = find_nodes(&dom.document, vec!["html", "head"])
        .pop()
        .ok_or_else(|| AnnotateError::Render("文档缺少 head 节点".to_string()))?;
    let body = find_nodes(&dom.document, vec!["html", "body"])
        .pop()
        .ok_or_else(|| AnnotateError::Render("文档缺少 body 节点".to_string()))?;

    if !has_child_with_id(&head, OVERLAY_STYLE_ID) {
        let style = create_element_node("style", vec![("id", OVERLAY_STYLE_ID)]);
        append_text_child(&style, OVERLAY_CSS);
        append_child(&head, style);
        tracing::debug!("已注入悬浮层样式");
    }

    if !has_child_with_id(&body, OVERLAY_SCRIPT_ID) {
        let script_source = OVERLAY_JS
            .replace("__FINMARK_API__", config.api_url.trim_end_matches('/'))
            .replace("__FINMARK_DWELL__", &config.hover_dwell_ms.to_string())
            .replace("__FINMARK_HIDE__", &config.hide_delay_ms.to_string());
        let script = create_element_node("script", vec![("id", OVERLAY_SCRIPT_ID)]);
        append_text_child(&script, &script_source);
        append_child(&body, script);
        tracing::debug!("已注入悬浮层脚本");
    }

    Ok(())
}

fn has_child_with_id(parent: &Handle, id: &str) -> bool {
    parent
        .children
        .borrow()
        .iter()
        .any(|child| get_node_attr(child, "id").as_deref() == Some(id))
}

fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(std::rc::Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

fn append_text_child(parent: &Handle, text: &str) {
    let text_node = create_text_node(text);
    append_child(parent, text_node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{get_node_name, html_to_dom};
    use crate::parsers::html::serializer::serialize_document;

    fn sample_dom() -> RcDom {
        html_to_dom(
            b"<html><head><title>t</title></head><body><p>Deposit</p></body></html>",
            "utf-8".to_string(),
        )
    }

    #[test]
    fn test_injects_style_and_script() {
        let dom = sample_dom();
        let config = AnnotateConfig::default();
        inject_overlay(&dom, &config).unwrap();

        let html = String::from_utf8(serialize_document(dom, "utf-8".to_string())).unwrap();
        assert!(html.contains("id=\"finmark-overlay-style\""));
        assert!(html.contains("id=\"finmark-overlay-script\""));
        assert!(html.contains("/define_term_text"));
        assert!(html.contains("var DWELL_MS = 700;"));
        assert!(html.contains("var HIDE_MS = 300;"));
    }

    #[test]
    fn test_injection_is_idempotent() {
        let dom = sample_dom();
        let config = AnnotateConfig::default();
        inject_overlay(&dom, &config).unwrap();
        inject_overlay(&dom, &config).unwrap();

        let body = find_nodes(&dom.document, vec!["html", "body"])
            .pop()
            .unwrap();
        let scripts = body
            .children
            .borrow()
            .iter()
            .filter(|child| get_node_name(child).as_deref() == Some("script"))
            .count();
        assert_eq!(scripts, 1);
    }

    #[test]
    fn test_api_url_placeholder_replaced() {
        let dom = sample_dom();
        let config = AnnotateConfig {
            api_url: "http://127.0.0.1:9000/".to_string(),
            ..Default::default()
        };
        inject_overlay(&dom, &config).unwrap();

        let html = String::from_utf8(serialize_document(dom, "utf-8".to_string())).unwrap();
        assert!(html.contains("'http://127.0.0.1:9000'"));
        assert!(!html.contains("__FINMARK_API__"));
    }
}
