use crate::dsp::format::ProcessingFormat;
use crate::dsp::stages::Stage;
use crate::dsp::stages::compressor::CompressorStage;
use crate::dsp::stages::filter::HighPassStage;
use crate::dsp::stages::level::LevelStage;
use crate::dsp::stages::shaper::{DEFAULT_DRIVE, ShaperCurve, ShaperStage};

pub const SAFETY_HIGH_PASS_HZ: f32 = 60.0;
pub const COMPRESSOR_THRESHOLD_DB: f32 = -18.0;
pub const COMPRESSOR_RATIO: f32 = 2.5;
pub const COMPRESSOR_ATTACK_MS: f32 = 8.0;
pub const COMPRESSOR_RELEASE_MS: f32 = 80.0;

pub const STAGE_COUNT: usize = 5;

/// Position of a stage in the chain. The order here is the processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageId {
    HighPass,
    Compressor,
    InputTrim,
    Shaper,
    OutputTrim,
}

impl StageId {
    pub const ALL: [Self; STAGE_COUNT] = [
        Self::HighPass,
        Self::Compressor,
        Self::InputTrim,
        Self::Shaper,
        Self::OutputTrim,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

// ProcessingChain holds the fixed sequence of stages. Stages are plain fields
// rather than a list so processing never allocates or resizes.
pub struct ProcessingChain {
    high_pass: HighPassStage,
    compressor: CompressorStage,
    input_trim: LevelStage,
    shaper: ShaperStage,
    output_trim: LevelStage,
    bypassed: [bool; STAGE_COUNT],
    format: Option<ProcessingFormat>,
}

impl Default for ProcessingChain {
    fn default() -> Self {
        Self::new(ShaperCurve::default())
    }
}

impl ProcessingChain {
    pub fn new(curve: ShaperCurve) -> Self {
        Self {
            high_pass: HighPassStage::new(SAFETY_HIGH_PASS_HZ),
            compressor: CompressorStage::new(
                COMPRESSOR_THRESHOLD_DB,
                COMPRESSOR_RATIO,
                COMPRESSOR_ATTACK_MS,
                COMPRESSOR_RELEASE_MS,
            ),
            input_trim: LevelStage::new(0.0),
            shaper: ShaperStage::new(curve, DEFAULT_DRIVE),
            output_trim: LevelStage::new(0.0),
            bypassed: [false; STAGE_COUNT],
            format: None,
        }
    }

    /// Format the chain was last prepared for, `None` before the first prepare.
    pub const fn format(&self) -> Option<ProcessingFormat> {
        self.format
    }

    pub const fn is_prepared(&self) -> bool {
        self.format.is_some()
    }

    /// Recomputes every stage for `format` and clears all stage state.
    pub fn prepare(&mut self, format: ProcessingFormat) {
        self.format = Some(format);
        for id in StageId::ALL {
            let stage = self.stage_mut(id);
            stage.prepare(&format);
            stage.reset();
        }
    }

    /// Clears filter history and envelopes, keeping coefficients and gains.
    pub fn reset(&mut self) {
        for id in StageId::ALL {
            self.stage_mut(id).reset();
        }
    }

    pub const fn set_bypassed(&mut self, id: StageId, bypassed: bool) {
        self.bypassed[id.index()] = bypassed;
    }

    pub const fn is_bypassed(&self, id: StageId) -> bool {
        self.bypassed[id.index()]
    }

    pub fn set_input_gain_db(&mut self, gain_db: f32) {
        self.input_trim.set_gain_db(gain_db);
    }

    pub fn set_output_gain_db(&mut self, gain_db: f32) {
        self.output_trim.set_gain_db(gain_db);
    }

    pub const fn input_gain_db(&self) -> f32 {
        self.input_trim.gain_db()
    }

    pub const fn output_gain_db(&self) -> f32 {
        self.output_trim.gain_db()
    }

    fn stage_mut(&mut self, id: StageId) -> &mut dyn Stage {
        match id {
            StageId::HighPass => &mut self.high_pass,
            StageId::Compressor => &mut self.compressor,
            StageId::InputTrim => &mut self.input_trim,
            StageId::Shaper => &mut self.shaper,
            StageId::OutputTrim => &mut self.output_trim,
        }
    }

    /// Runs every non-bypassed stage over the block in place. Channels beyond
    /// the prepared channel count are left untouched, and an unprepared chain
    /// leaves the whole block untouched.
    pub fn process_block(&mut self, block: &mut [&mut [f32]]) {
        let channels = self.format.map_or(0, |f| f.channels()).min(block.len());
        let block = &mut block[..channels];

        for id in StageId::ALL {
            if !self.bypassed[id.index()] {
                self.stage_mut(id).process_block(block);
            }
        }
    }
}
