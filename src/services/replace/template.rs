//! 替换模板展开
//!
//! 对模板做一趟显式的记号替换：
//! - `$&` 全匹配，`$1`..`$99` 捕获组（缺失组替换为空串）
//! - `$$` 字面 `$`，``$` `` 与 `$'` 为匹配所在行内的前后文
//! - 其余 `$` 序列按字面保留
//!
//! 仅在模式搜索下调用；字面搜索的模板原样插入，不做任何解释

use regex::Captures;

/// 按模板展开一次匹配。
/// `context` 是 `haystack` 内包住本次匹配的行边界，``$` ``/`$'`
/// 取的是行内前后文而不是整个 haystack
pub(crate) fn expand(
    template: &str,
    caps: &Captures<'_>,
    haystack: &str,
    context: (usize, usize),
) -> String {
    let Some(m) = caps.get(0) else {
        return template.to_string();
    };
    let (ctx_start, ctx_end) = context;
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len() + m.as_str().len());
    let mut i = 0usize;

    while let Some(offset) = memchr::memchr(b'$', &bytes[i..]) {
        let dollar = i + offset;
        out.push_str(&template[i..dollar]);
        match bytes.get(dollar + 1) {
            Some(b'$') => {
                out.push('$');
                i = dollar + 2;
            }
            Some(b'&') => {
                out.push_str(m.as_str());
                i = dollar + 2;
            }
            Some(b'`') => {
                out.push_str(&haystack[ctx_start..m.start()]);
                i = dollar + 2;
            }
            Some(b'\'') => {
                out.push_str(&haystack[m.end()..ctx_end]);
                i = dollar + 2;
            }
            Some(&c) if c.is_ascii_digit() && c != b'0' => {
                let mut group = (c - b'0') as usize;
                let mut consumed = 2;
                // 两位组号只有当该组在模式中存在时才成立，
                // 否则第二位按字面跟在单位组之后
                if let Some(&c2) = bytes.get(dollar + 2) {
                    if c2.is_ascii_digit() {
                        let two = group * 10 + (c2 - b'0') as usize;
                        if two < caps.len() {
                            group = two;
                            consumed = 3;
                        }
                    }
                }
                out.push_str(caps.get(group).map(|g| g.as_str()).unwrap_or(""));
                i = dollar + consumed;
            }
            _ => {
                out.push('$');
                i = dollar + 1;
            }
        }
    }

    out.push_str(&template[i..]);
    out
}
