use std::fmt;
use std::str::FromStr;

/// Name of the notification method an engine uses to report terminal events.
pub const EVENT_METHOD: &str = "event";

/// Commands understood by a terminal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    RegisterTerminal,
    DisposeTerminal,
    GetRows,
    GetCols,
    Focus,
    Blur,
    Resize,
    HasSelection,
    GetSelection,
    GetSelectionPosition,
    ClearSelection,
    Select,
    SelectAll,
    SelectLines,
    ScrollLines,
    ScrollPages,
    ScrollToTop,
    ScrollToBottom,
    ScrollToLine,
    Clear,
    Write,
    Writeln,
    Paste,
    Refresh,
    Reset,
}

impl Method {
    pub const ALL: [Method; 25] = [
        Method::RegisterTerminal,
        Method::DisposeTerminal,
        Method::GetRows,
        Method::GetCols,
        Method::Focus,
        Method::Blur,
        Method::Resize,
        Method::HasSelection,
        Method::GetSelection,
        Method::GetSelectionPosition,
        Method::ClearSelection,
        Method::Select,
        Method::SelectAll,
        Method::SelectLines,
        Method::ScrollLines,
        Method::ScrollPages,
        Method::ScrollToTop,
        Method::ScrollToBottom,
        Method::ScrollToLine,
        Method::Clear,
        Method::Write,
        Method::Writeln,
        Method::Paste,
        Method::Refresh,
        Method::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::RegisterTerminal => "registerTerminal",
            Method::DisposeTerminal => "disposeTerminal",
            Method::GetRows => "getRows",
            Method::GetCols => "getCols",
            Method::Focus => "focus",
            Method::Blur => "blur",
            Method::Resize => "resize",
            Method::HasSelection => "hasSelection",
            Method::GetSelection => "getSelection",
            Method::GetSelectionPosition => "getSelectionPosition",
            Method::ClearSelection => "clearSelection",
            Method::Select => "select",
            Method::SelectAll => "selectAll",
            Method::SelectLines => "selectLines",
            Method::ScrollLines => "scrollLines",
            Method::ScrollPages => "scrollPages",
            Method::ScrollToTop => "scrollToTop",
            Method::ScrollToBottom => "scrollToBottom",
            Method::ScrollToLine => "scrollToLine",
            Method::Clear => "clear",
            Method::Write => "write",
            Method::Writeln => "writeln",
            Method::Paste => "paste",
            Method::Refresh => "refresh",
            Method::Reset => "reset",
        }
    }

    /// `"<namespace>.<name>"`, or the bare name when the namespace is empty.
    pub fn qualified(&self, namespace: &str) -> String {
        if namespace.is_empty() {
            self.as_str().to_string()
        } else {
            format!("{}.{}", namespace, self.as_str())
        }
    }

    /// Inverse of [`Method::qualified`].
    pub fn from_qualified(namespace: &str, name: &str) -> Option<Method> {
        let bare = if namespace.is_empty() {
            name
        } else {
            name.strip_prefix(namespace)?.strip_prefix('.')?
        };
        bare.parse().ok()
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|method| method.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_method_parses_back() {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>(), Ok(method));
        }
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(Method::GetCols.qualified("termbridge"), "termbridge.getCols");
        assert_eq!(Method::Writeln.qualified(""), "writeln");
        assert_eq!(
            Method::from_qualified("termbridge", "termbridge.selectLines"),
            Some(Method::SelectLines)
        );
        assert_eq!(Method::from_qualified("termbridge", "other.selectLines"), None);
        assert_eq!(Method::from_qualified("termbridge", "termbridgeselectLines"), None);
    }
}
