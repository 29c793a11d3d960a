//! Sample classroom data for demos and manual testing
//!
//! Five biology notes and fifteen chat messages written to exercise both the
//! study guide and the confusion summary.

use cogni_common::models::{NewMessage, NewUpload};
use tracing::info;

use crate::store::{ClassroomStore, StoreError};

/// (title, content) pairs
pub const SAMPLE_UPLOADS: [(&str, &str); 5] = [
    (
        "Cell Structure Notes - Chapter 3",
        r#"Cell Structure and Function

The cell is the basic unit of life. All living organisms are made up of cells.

Key Organelles:
- Nucleus: Contains DNA, controls cell activities
- Mitochondria: Powerhouse of the cell, produces ATP through cellular respiration
- Ribosomes: Protein synthesis
- Endoplasmic Reticulum (ER):
  - Rough ER: Has ribosomes, makes proteins
  - Smooth ER: Makes lipids, detoxifies
- Golgi Apparatus: Packages and ships proteins
- Cell Membrane: Controls what enters/exits the cell (selectively permeable)
- Cytoplasm: Gel-like fluid inside the cell

Plant cells also have:
- Cell Wall: Provides structure and support
- Chloroplasts: Site of photosynthesis
- Large Central Vacuole: Stores water and nutrients

Remember: Prokaryotes (bacteria) don't have membrane-bound organelles!"#,
    ),
    (
        "Mitosis Notes",
        r#"Mitosis - Cell Division

Mitosis is how cells divide to create two identical daughter cells.

Phases of Mitosis:
1. INTERPHASE (not technically mitosis)
   - Cell grows and copies DNA
   - G1 → S → G2

2. PROPHASE
   - Chromatin condenses into chromosomes
   - Nuclear membrane breaks down
   - Spindle fibers form

3. METAPHASE
   - Chromosomes line up in the MIDDLE
   - Spindle fibers attach to centromeres

4. ANAPHASE
   - Sister chromatids are pulled APART
   - Move to opposite poles

5. TELOPHASE
   - Nuclear membranes reform
   - Chromosomes decondense
   - Cytokinesis begins (cell splits)

Mnemonic: PMAT (Prophase, Metaphase, Anaphase, Telophase)

Why is mitosis important?
- Growth
- Repair
- Asexual reproduction"#,
    ),
    (
        "Photosynthesis Summary",
        r#"Photosynthesis

The process by which plants convert light energy into chemical energy (glucose).

Overall Equation:
6CO2 + 6H2O + light energy → C6H12O6 + 6O2

Location: Chloroplasts (specifically in the thylakoid membranes and stroma)

Two Main Stages:

1. LIGHT-DEPENDENT REACTIONS
   - Occur in thylakoid membranes
   - Need sunlight
   - Water is split (photolysis)
   - Produces ATP and NADPH
   - Releases O2 as byproduct

2. LIGHT-INDEPENDENT REACTIONS (Calvin Cycle)
   - Occur in stroma
   - Don't need direct light
   - Uses ATP and NADPH from light reactions
   - CO2 is fixed into glucose
   - Also called "carbon fixation"

Factors affecting photosynthesis:
- Light intensity
- CO2 concentration
- Temperature
- Water availability"#,
    ),
    (
        "Cellular Respiration",
        r#"Cellular Respiration

The process of breaking down glucose to release energy (ATP).

Overall Equation:
C6H12O6 + 6O2 → 6CO2 + 6H2O + ATP

Three Main Stages:

1. GLYCOLYSIS
   - Location: Cytoplasm
   - Breaks glucose (6C) into 2 pyruvate (3C)
   - Produces: 2 ATP, 2 NADH
   - Doesn't need oxygen (anaerobic)

2. KREBS CYCLE (Citric Acid Cycle)
   - Location: Mitochondrial matrix
   - Pyruvate converted to Acetyl-CoA first
   - Produces: 2 ATP, 6 NADH, 2 FADH2
   - Releases CO2

3. ELECTRON TRANSPORT CHAIN
   - Location: Inner mitochondrial membrane
   - Uses NADH and FADH2
   - Produces: 32-34 ATP
   - Needs oxygen (aerobic)
   - Water is produced

Total ATP: ~36-38 per glucose molecule

Anaerobic respiration (fermentation):
- Lactic acid fermentation (muscles)
- Alcoholic fermentation (yeast)"#,
    ),
    (
        "DNA Structure and Replication",
        r#"DNA Structure

DNA = Deoxyribonucleic Acid

Structure:
- Double helix (twisted ladder)
- Made of nucleotides
- Each nucleotide has:
  - Phosphate group
  - Deoxyribose sugar
  - Nitrogenous base

The Four Bases:
- Adenine (A) pairs with Thymine (T)
- Guanine (G) pairs with Cytosine (C)
- A-T has 2 hydrogen bonds
- G-C has 3 hydrogen bonds

DNA Replication:
1. Helicase unzips the double helix
2. DNA polymerase adds new nucleotides
3. Leading strand: continuous
4. Lagging strand: Okazaki fragments
5. Ligase joins fragments together

Replication is SEMI-CONSERVATIVE:
Each new DNA molecule has one old strand and one new strand

Why is DNA replication important?
- Cell division
- Passing genetic info to offspring
- Maintaining genetic continuity"#,
    ),
];

pub const SAMPLE_MESSAGES: [&str; 15] = [
    "Can someone explain the difference between mitosis and meiosis?",
    "I'm confused about the light reactions vs Calvin cycle",
    "Wait, so ATP is made in both photosynthesis AND respiration?",
    "How do I remember all the phases of mitosis?",
    "Is the mitochondria really the powerhouse of the cell lol",
    "I don't understand how DNA replication works",
    "What's the difference between rough and smooth ER?",
    "Why do plant cells have cell walls but animal cells don't?",
    "The Krebs cycle is so confusing",
    "Can someone help me understand electron transport chain?",
    "I keep mixing up glycolysis and the Calvin cycle",
    "What does semi-conservative mean for DNA replication?",
    "How many ATP does cellular respiration actually make?",
    "I'm struggling with the photosynthesis equation",
    "Does anyone have good mnemonics for the cell organelles?",
];

/// Rows written by [`seed_classroom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub uploads: usize,
    pub messages: usize,
}

/// Insert the sample uploads and messages into a classroom
pub async fn seed_classroom(
    store: &dyn ClassroomStore,
    classroom_id: &str,
    user_id: &str,
) -> Result<SeedSummary, StoreError> {
    info!(classroom_id, "Seeding sample data");

    for (title, content) in SAMPLE_UPLOADS {
        store
            .insert_upload(&NewUpload {
                classroom_id: classroom_id.to_string(),
                user_id: user_id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                file_type: "text".to_string(),
            })
            .await?;
        info!(title, "Added upload");
    }

    for content in SAMPLE_MESSAGES {
        store
            .insert_message(&NewMessage {
                classroom_id: classroom_id.to_string(),
                user_id: user_id.to_string(),
                content: content.to_string(),
                channel: "general".to_string(),
            })
            .await?;
    }
    info!(count = SAMPLE_MESSAGES.len(), "Added sample messages");

    Ok(SeedSummary {
        uploads: SAMPLE_UPLOADS.len(),
        messages: SAMPLE_MESSAGES.len(),
    })
}
