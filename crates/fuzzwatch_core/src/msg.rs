#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Raw text frame from the push channel.
    FrameReceived(String),
    /// Already decoded server event.
    Server(crate::ServerEvent),
    /// Connection manager reported a status change.
    ConnectionChanged(crate::ConnectionState),
    /// User asked for an issue page (1-based, clamped).
    PageRequested(u32),
    /// Explicit refresh or periodic poll.
    RefreshRequested,
    ProjectionShown(crate::Projection),
    ProjectionHidden(crate::Projection),
    /// User opened the detail of an issue, by internal id.
    IssueDetailRequested(String),
    /// User asked the server to delete an issue, by internal id.
    DeleteIssueRequested(String),
}
