//! Hand landmarks.

use std::fmt;

use anyhow::bail;

/// Number of landmarks in every [`HandObservation`].
pub const NUM_LANDMARKS: usize = 21;

/// A landmark position reported by a detector.
///
/// `x` and `y` are normalized to the frame the hand was detected in, so they lie in range 0.0 to
/// 1.0 for points inside the frame. Points of a hand that is partially out of view may lie outside
/// that range. `z` is the depth relative to the wrist, roughly on the same scale as `x`; smaller
/// values are closer to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pos: [f32; 3],
}

impl Landmark {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { pos: [x, y, z] }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.pos[2]
    }
}

/// Which hand an observation belongs to, as seen in the (unmirrored) camera image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// The landmarks of a single detected hand.
///
/// Always contains exactly [`NUM_LANDMARKS`] landmarks, ordered as listed by [`LandmarkIdx`].
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    landmarks: [Landmark; NUM_LANDMARKS],
    confidence: f32,
    handedness: Option<Handedness>,
}

impl HandObservation {
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS], confidence: f32) -> Self {
        Self {
            landmarks,
            confidence,
            handedness: None,
        }
    }

    /// Creates an observation from a dynamically sized list of landmarks.
    ///
    /// Returns an error if `landmarks` does not contain exactly [`NUM_LANDMARKS`] entries.
    pub fn from_landmarks(landmarks: Vec<Landmark>, confidence: f32) -> anyhow::Result<Self> {
        let len = landmarks.len();
        match <[Landmark; NUM_LANDMARKS]>::try_from(landmarks) {
            Ok(landmarks) => Ok(Self::new(landmarks, confidence)),
            Err(_) => bail!("hand observation needs {NUM_LANDMARKS} landmarks, got {len}"),
        }
    }

    pub fn with_handedness(self, handedness: Handedness) -> Self {
        Self {
            handedness: Some(handedness),
            ..self
        }
    }

    #[inline]
    pub fn landmarks(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.landmarks
    }

    #[inline]
    pub fn landmark(&self, idx: LandmarkIdx) -> Landmark {
        self.landmarks[idx as usize]
    }

    /// Presence confidence of the hand, in range 0.0 to 1.0.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the estimated handedness, if the detector provides one.
    #[inline]
    pub fn handedness(&self) -> Option<Handedness> {
        self.handedness
    }
}

/// The 21 hand landmarks, in the order detectors report them.
///
/// Joint abbreviations, from the wrist outwards: CMC (thumb base), MCP (knuckle), IP or PIP/DIP
/// (middle and outer finger joints). `Tip` marks the fingertip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl LandmarkIdx {
    /// All landmarks, in the order they are stored in a [`HandObservation`].
    pub const ALL: [LandmarkIdx; NUM_LANDMARKS] = {
        use LandmarkIdx::*;
        [
            Wrist,
            ThumbCmc,
            ThumbMcp,
            ThumbIp,
            ThumbTip,
            IndexFingerMcp,
            IndexFingerPip,
            IndexFingerDip,
            IndexFingerTip,
            MiddleFingerMcp,
            MiddleFingerPip,
            MiddleFingerDip,
            MiddleFingerTip,
            RingFingerMcp,
            RingFingerPip,
            RingFingerDip,
            RingFingerTip,
            PinkyMcp,
            PinkyPip,
            PinkyDip,
            PinkyTip,
        ]
    };

    /// Looks up the landmark with numeric identifier `index`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LandmarkIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The skeleton edges drawn between landmarks.
pub const CONNECTIONS: [(LandmarkIdx, LandmarkIdx); 21] = {
    use LandmarkIdx::*;
    [
        // Palm
        (Wrist, ThumbCmc),
        (Wrist, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (Wrist, PinkyMcp),
        // Thumb
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

/// A landmark mapped to integer pixel coordinates of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLandmark {
    /// Landmark identifier (see [`LandmarkIdx`]).
    pub id: usize,
    pub x: i32,
    pub y: i32,
}
