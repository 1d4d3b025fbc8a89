use bytes::Bytes;

/// An event the application pulls from the request side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The request body. Function calls deliver it whole, so `more_body`
    /// is always `false`.
    Request { body: Bytes, more_body: bool },
    /// The client is gone: the response has completed or the call was
    /// cancelled.
    Disconnect,
}

/// An event the application pushes on the response side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    ResponseStart {
        status: u16,
        headers: Vec<(Bytes, Bytes)>,
    },
    ResponseBody {
        body: Bytes,
        more_body: bool,
    },
}

impl OutboundEvent {
    pub fn start<N, V>(status: u16, headers: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<Bytes>,
        V: Into<Bytes>,
    {
        OutboundEvent::ResponseStart {
            status,
            headers: headers
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }

    pub fn body(body: impl Into<Bytes>, more_body: bool) -> Self {
        OutboundEvent::ResponseBody {
            body: body.into(),
            more_body,
        }
    }

    /// Returns `true` for the body chunk that ends the response.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OutboundEvent::ResponseBody {
                more_body: false,
                ..
            }
        )
    }

    /// Protocol name of the event type, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::ResponseStart { .. } => "http.response.start",
            OutboundEvent::ResponseBody { .. } => "http.response.body",
        }
    }
}
