/*!
Scan-session plumbing.

This module defines the seam toward the scanning backend and the lifecycle
machinery that drives polling:
- `source`: `ScanBackend` trait plus the snapshot and error types it speaks.
- `session`: the monitoring state machine governing poll cadence, start/stop
  and stale-response rejection.
*/

pub mod session;
pub mod source;
