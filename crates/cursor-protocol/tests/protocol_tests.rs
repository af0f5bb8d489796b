//! Protocol layer tests — peer frame decoding, identity stamping, wire shape.

#[cfg(test)]
mod tests {
    use cursor_protocol::*;
    use serde_json::json;

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Peer frames
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn peer_frame_becomes_move_from_sender() {
        let event = PositionEvent::from_peer(r#"{"x":10,"y":20}"#, &sid("a1")).unwrap();
        assert_eq!(event.x, 10);
        assert_eq!(event.y, 20);
        assert_eq!(event.session_id, sid("a1"));
        assert_eq!(event.method, Method::Move);
    }

    #[test]
    fn peer_cannot_spoof_session_or_method() {
        let frame = r#"{"x":1,"y":2,"sessionId":"evil","method":"leave"}"#;
        let event = PositionEvent::from_peer(frame, &sid("abc")).unwrap();
        assert_eq!(event.session_id.as_str(), "abc");
        assert_eq!(event.method, Method::Move);
        assert_eq!((event.x, event.y), (1, 2));
    }

    #[test]
    fn missing_coordinates_default_to_zero() {
        let event = PositionEvent::from_peer(r#"{"y":7}"#, &sid("s")).unwrap();
        assert_eq!((event.x, event.y), (0, 7));
    }

    #[test]
    fn non_numeric_coordinate_is_rejected() {
        let err = PositionEvent::from_peer(r#"{"x":"left","y":2}"#, &sid("s")).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
        assert!(err.to_string().starts_with("invalid position payload"));
    }

    #[test]
    fn garbage_frame_is_rejected() {
        assert!(PositionEvent::from_peer("not json", &sid("s")).is_err());
        assert!(PositionEvent::from_peer("[1,2]", &sid("s")).is_err());
    }

    #[test]
    fn binary_frame_must_be_utf8() {
        let err = PeerPosition::decode_bytes(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, DecodeError::NotUtf8));

        let pos = PeerPosition::decode_bytes(br#"{"x":3,"y":4}"#).unwrap();
        assert_eq!(pos, PeerPosition { x: 3, y: 4 });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Outbound wire shape
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn move_serializes_with_all_fields() {
        let event = PositionEvent::moved(&sid("a1"), PeerPosition { x: 10, y: 20 });
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"x": 10, "y": 20, "sessionId": "a1", "method": "move"}));
    }

    #[test]
    fn leave_serializes_with_zeroed_position() {
        let event = PositionEvent::leave(&sid("a1"));
        assert!(event.is_leave());
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"x": 0, "y": 0, "sessionId": "a1", "method": "leave"}));
    }

    #[test]
    fn method_names() {
        assert_eq!(Method::Move.as_str(), "move");
        assert_eq!(Method::Leave.as_str(), "leave");
        assert_eq!(serde_json::to_value(Method::Leave).unwrap(), json!("leave"));
    }

    #[test]
    fn session_id_is_a_plain_string_on_the_wire() {
        let id = SessionId::new("f00d");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("f00d"));
        assert_eq!(id.to_string(), "f00d");
    }
}
